//! Route handlers. Each one resolves the caller, decodes the body and hands
//! off to `db`; failures travel back as `CoreError` and are rendered by the
//! router in `lib.rs`.

use crate::auth;
use crate::config::{Config, DB_BINDING};
use crate::db;
use crate::error::{CoreError, CoreResult};
use crate::models;
use crate::tenant::{self, Caller};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use worker::{D1Database, Request, RouteContext};

pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// An authenticated request: the store handle plus who is calling.
pub struct Session {
    pub db: D1Database,
    pub user: models::User,
    pub caller: Caller,
}

impl Session {
    async fn open(req: &Request, ctx: &RouteContext<Config>) -> CoreResult<Self> {
        let db = ctx.env.d1(DB_BINDING)?;
        let token = tenant::bearer_token(req)?;
        let user = db::authenticate(&db, &ctx.data, &token).await?;
        let caller = Caller::of(&user);
        Ok(Self { db, user, caller })
    }
}

fn param(ctx: &RouteContext<Config>, name: &str) -> CoreResult<String> {
    ctx.param(name)
        .cloned()
        .ok_or_else(|| CoreError::Validation(format!("missing path parameter {name}")))
}

// ── Body decoding ───────────────────────────────────────────────

fn check_declared_length(value: &str) -> CoreResult<()> {
    let declared = value
        .trim()
        .parse::<usize>()
        .map_err(|_| CoreError::Validation("invalid content-length header".into()))?;
    if declared > MAX_BODY_BYTES {
        return Err(CoreError::PayloadTooLarge);
    }
    Ok(())
}

fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    serde_json::from_slice(bytes).map_err(|err| CoreError::Validation(err.to_string()))
}

/// Stream the body into memory, refusing anything over `MAX_BODY_BYTES`
/// whether or not `content-length` was declared.
async fn read_json<T: DeserializeOwned>(req: &mut Request) -> CoreResult<T> {
    if let Some(value) = req.headers().get("content-length")? {
        check_declared_length(&value)?;
    }

    let mut stream = req
        .stream()
        .map_err(|_| CoreError::Validation("request body is required".into()))?;
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if body.len().saturating_add(chunk.len()) > MAX_BODY_BYTES {
            return Err(CoreError::PayloadTooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    parse_json(&body)
}

// ── Auth ────────────────────────────────────────────────────────

pub async fn register(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::TokenResponse> {
    let body: models::RegisterUser = read_json(&mut req).await?;
    let db = ctx.env.d1(DB_BINDING)?;
    db::register(&db, &ctx.data, &body).await
}

pub async fn login(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::TokenResponse> {
    let body: models::LoginRequest = read_json(&mut req).await?;
    let db = ctx.env.d1(DB_BINDING)?;
    db::login(&db, &ctx.data, &body).await
}

pub async fn refresh(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::TokenResponse> {
    let body: models::RefreshRequest = read_json(&mut req).await?;
    auth::refresh_pair(&ctx.data, &body.refresh_token, db::now_secs())
}

pub async fn me(req: Request, ctx: RouteContext<Config>) -> CoreResult<models::User> {
    Ok(Session::open(&req, &ctx).await?.user)
}

// ── Projects ────────────────────────────────────────────────────

pub async fn list_projects(req: Request, ctx: RouteContext<Config>) -> CoreResult<Vec<models::Project>> {
    let s = Session::open(&req, &ctx).await?;
    db::list_projects(&s.db, &s.caller.organization_id).await
}

pub async fn create_project(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Project> {
    let s = Session::open(&req, &ctx).await?;
    let body: models::CreateProject = read_json(&mut req).await?;
    db::create_project(&s.db, &s.caller, &body).await
}

// ── Artifacts ───────────────────────────────────────────────────

pub async fn list_artifacts(req: Request, ctx: RouteContext<Config>) -> CoreResult<Vec<models::Artifact>> {
    let s = Session::open(&req, &ctx).await?;
    db::list_artifacts(&s.db, &s.caller.organization_id).await
}

pub async fn create_artifact(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Artifact> {
    let s = Session::open(&req, &ctx).await?;
    let body: models::CreateArtifact = read_json(&mut req).await?;
    db::create_artifact(&s.db, &s.caller, &body).await
}

pub async fn get_artifact(req: Request, ctx: RouteContext<Config>) -> CoreResult<models::ArtifactDetail> {
    let s = Session::open(&req, &ctx).await?;
    let id = param(&ctx, "id")?;
    db::get_artifact(&s.db, &id, &s.caller.organization_id).await
}

pub async fn update_artifact(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Artifact> {
    let s = Session::open(&req, &ctx).await?;
    let id = param(&ctx, "id")?;
    let patch: models::UpdateArtifact = read_json(&mut req).await?;
    db::update_artifact(&s.db, &id, &s.caller.organization_id, &patch).await
}

pub async fn delete_artifact(req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Deleted> {
    let s = Session::open(&req, &ctx).await?;
    let id = param(&ctx, "id")?;
    db::delete_artifact(&s.db, &id, &s.caller.organization_id).await?;
    Ok(models::Deleted::confirmed())
}

// ── SOPs ────────────────────────────────────────────────────────

pub async fn list_sops(req: Request, ctx: RouteContext<Config>) -> CoreResult<Vec<models::Sop>> {
    let s = Session::open(&req, &ctx).await?;
    db::list_sops(&s.db, &s.caller.organization_id).await
}

pub async fn create_sop(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::SopDetail> {
    let s = Session::open(&req, &ctx).await?;
    let body: models::CreateSop = read_json(&mut req).await?;
    db::create_sop(&s.db, &s.caller, &body).await
}

pub async fn get_sop(req: Request, ctx: RouteContext<Config>) -> CoreResult<models::SopDetail> {
    let s = Session::open(&req, &ctx).await?;
    let id = param(&ctx, "id")?;
    db::get_sop(&s.db, &id, &s.caller.organization_id).await
}

pub async fn delete_sop(req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Deleted> {
    let s = Session::open(&req, &ctx).await?;
    let id = param(&ctx, "id")?;
    db::delete_sop(&s.db, &id, &s.caller.organization_id).await?;
    Ok(models::Deleted::confirmed())
}

// ── Templates ───────────────────────────────────────────────────

pub async fn list_templates(req: Request, ctx: RouteContext<Config>) -> CoreResult<Vec<models::Template>> {
    let s = Session::open(&req, &ctx).await?;
    db::list_templates(&s.db, &s.caller.organization_id).await
}

pub async fn create_template(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Template> {
    let s = Session::open(&req, &ctx).await?;
    let body: models::CreateTemplate = read_json(&mut req).await?;
    db::create_template(&s.db, &s.caller, &body).await
}

pub async fn template_gallery(req: Request, ctx: RouteContext<Config>) -> CoreResult<Vec<models::Template>> {
    let s = Session::open(&req, &ctx).await?;
    db::template_gallery(&s.db, &s.caller.organization_id).await
}

pub async fn promote_artifact(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Template> {
    let s = Session::open(&req, &ctx).await?;
    let body: models::PromoteArtifact = read_json(&mut req).await?;
    db::promote_artifact(&s.db, &s.caller, &body).await
}

pub async fn import_template(mut req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Artifact> {
    let s = Session::open(&req, &ctx).await?;
    let body: models::ImportTemplate = read_json(&mut req).await?;
    db::import_template(&s.db, &s.caller, &body).await
}

pub async fn delete_template(req: Request, ctx: RouteContext<Config>) -> CoreResult<models::Deleted> {
    let s = Session::open(&req, &ctx).await?;
    let id = param(&ctx, "id")?;
    db::delete_template(&s.db, &id, &s.caller.organization_id).await?;
    Ok(models::Deleted::confirmed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_length_over_cap_is_too_large() {
        assert!(check_declared_length("0").is_ok());
        assert!(check_declared_length(&MAX_BODY_BYTES.to_string()).is_ok());
        assert!(matches!(
            check_declared_length(&(MAX_BODY_BYTES + 1).to_string()),
            Err(CoreError::PayloadTooLarge)
        ));
    }

    #[test]
    fn unparseable_content_length_is_rejected() {
        assert!(matches!(
            check_declared_length("lots"),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            check_declared_length("-1"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_validation_failure() {
        let err = parse_json::<models::CreateArtifact>(b"{\"title\":").unwrap_err();
        assert_eq!(err.status(), 422);

        let err = parse_json::<models::CreateArtifact>(br#"{"title":"t"}"#).unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn well_formed_body_decodes() {
        let body: models::PromoteArtifact = parse_json(
            br#"{"artifact_id":"a1","sanitization_checklist":{"Removed PII":true}}"#,
        )
        .unwrap();
        assert_eq!(body.artifact_id, "a1");
        assert_eq!(body.sanitization_checklist.get("Removed PII"), Some(&true));
    }
}
