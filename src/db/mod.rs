use crate::artifacts;
use crate::auth;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::models;
use crate::sops;
use crate::templates;
use crate::tenant::{self, Caller};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsValue;
use worker::{console_log, D1Database, D1PreparedStatement, D1Result, Error};

mod sql;


pub fn now_iso() -> String {
    js_sys::Date::new_0().to_iso_string().into()
}

pub fn now_secs() -> u64 {
    (js_sys::Date::now() / 1000.0) as u64
}

pub fn new_id() -> CoreResult<String> {
    let mut buf = [0u8; 16];
    getrandom::getrandom(&mut buf)
        .map_err(|err| Error::RustError(format!("failed to generate id: {err}")))?;
    Ok(hex::encode(buf))
}

fn opt_str(s: &Option<String>) -> JsValue {
    match s {
        Some(s) => JsValue::from_str(s),
        None => JsValue::NULL,
    }
}

// D1 takes numbers as f64; an i64 would cross as a BigInt.
fn num(n: i64) -> JsValue {
    JsValue::from_f64(n as f64)
}

fn flag(b: bool) -> JsValue {
    num(i64::from(b))
}

fn opt_checklist(checklist: &Option<models::SanitizationChecklist>) -> CoreResult<JsValue> {
    Ok(match checklist {
        Some(c) => JsValue::from_str(&serde_json::to_string(c).map_err(Error::from)?),
        None => JsValue::NULL,
    })
}

fn changed(result: &D1Result) -> CoreResult<bool> {
    Ok(result
        .meta()?
        .map(|m| m.changes.unwrap_or(0) > 0)
        .unwrap_or(false))
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("UNIQUE constraint failed")
}

/// Registration needs a fresh email and a fresh organization slug; the email
/// is reported first when both are taken.
fn ensure_unclaimed(email_taken: bool, slug_taken: bool) -> CoreResult<()> {
    if email_taken {
        return Err(CoreError::Conflict("Email already registered".into()));
    }
    if slug_taken {
        return Err(CoreError::Conflict("Organization slug already exists".into()));
    }
    Ok(())
}

/// Take the next statement result out of a batch response.
fn next_result(results: &mut impl Iterator<Item = D1Result>) -> CoreResult<D1Result> {
    results
        .next()
        .ok_or_else(|| Error::RustError("batch returned fewer results than statements".into()).into())
}

fn all_rows<T: DeserializeOwned>(result: &D1Result) -> CoreResult<Vec<T>> {
    Ok(result.results()?)
}

async fn count(db: &D1Database, sql: &str, value: &str) -> CoreResult<i64> {
    let row: Option<CountRow> = db
        .prepare(sql)
        .bind(&[JsValue::from_str(value)])?
        .first(None)
        .await?;
    Ok(row.map(|r| r.count).unwrap_or(0))
}

// ── Organizations & users ───────────────────────────────────────

/// Create an organization and its first user, then hand back a token pair.
pub async fn register(
    db: &D1Database,
    config: &Config,
    body: &models::RegisterUser,
) -> CoreResult<models::TokenResponse> {
    tenant::validate_registration(body)?;

    let slug = tenant::organization_slug(&body.organization_name);
    let email_taken = count(db, sql::COUNT_USERS_BY_EMAIL, &body.email).await? > 0;
    let slug_taken =
        !email_taken && count(db, sql::COUNT_ORGANIZATIONS_BY_SLUG, &slug).await? > 0;
    ensure_unclaimed(email_taken, slug_taken)?;

    let now = now_iso();
    let org = tenant::new_organization(new_id()?, &body.organization_name, &now);
    let user = tenant::new_user(new_id()?, body, &org.id, &now);
    let hashed_password = auth::hash_password(&body.password)?;

    let stmts = vec![
        db.prepare(sql::INSERT_ORGANIZATION).bind(&[
            JsValue::from_str(&org.id),
            JsValue::from_str(&org.name),
            JsValue::from_str(&org.slug),
            JsValue::from_str(&org.created_at),
            JsValue::from_str(&org.updated_at),
        ])?,
        db.prepare(sql::INSERT_USER).bind(&[
            JsValue::from_str(&user.id),
            JsValue::from_str(&user.email),
            JsValue::from_str(&hashed_password),
            JsValue::from_str(&user.full_name),
            JsValue::from_str(&user.organization_id),
            flag(user.is_active),
            JsValue::from_str(&user.created_at),
            JsValue::from_str(&user.updated_at),
        ])?,
    ];

    // A concurrent registration can slip past the lookups above; the unique
    // indexes still reject it and the batch rolls back as a whole.
    db.batch(stmts).await.map_err(|err| {
        if is_unique_violation(&err.to_string()) {
            CoreError::Conflict("Email or organization slug already registered".into())
        } else {
            CoreError::from(err)
        }
    })?;

    console_log!(
        "registered organization {} ({}) with first user {}",
        org.id,
        org.slug,
        user.id
    );
    auth::issue_pair(config, &user.id, now_secs())
}

pub async fn login(
    db: &D1Database,
    config: &Config,
    body: &models::LoginRequest,
) -> CoreResult<models::TokenResponse> {
    let row: Option<UserRow> = db
        .prepare(sql::SELECT_USER_BY_EMAIL)
        .bind(&[JsValue::from_str(&body.email)])?
        .first(None)
        .await?;

    match row {
        Some(row) if auth::verify_password(&body.password, &row.hashed_password) => {
            auth::issue_pair(config, &row.id, now_secs())
        }
        _ => Err(CoreError::unauthenticated("Invalid email or password")),
    }
}

/// Resolve a bearer token to the user it was issued for. Only access tokens
/// are accepted, and the user must still exist.
pub async fn authenticate(db: &D1Database, config: &Config, token: &str) -> CoreResult<models::User> {
    let claims = auth::verify_token(&config.jwt_secret, token, now_secs())?;
    if claims.kind != auth::TokenKind::Access {
        return Err(CoreError::unauthenticated("Invalid authentication credentials"));
    }

    let row: Option<UserRow> = db
        .prepare(sql::SELECT_USER_BY_ID)
        .bind(&[JsValue::from_str(&claims.sub)])?
        .first(None)
        .await?;
    row.map(UserRow::into_user)
        .ok_or_else(|| CoreError::unauthenticated("User not found"))
}

// ── Projects ────────────────────────────────────────────────────

pub async fn create_project(
    db: &D1Database,
    caller: &Caller,
    body: &models::CreateProject,
) -> CoreResult<models::Project> {
    let project = tenant::new_project(new_id()?, caller, body, &now_iso());

    db.prepare(sql::INSERT_PROJECT)
        .bind(&[
            JsValue::from_str(&project.id),
            JsValue::from_str(&project.name),
            opt_str(&project.description),
            JsValue::from_str(&project.organization_id),
            JsValue::from_str(&project.created_at),
            JsValue::from_str(&project.updated_at),
        ])?
        .run()
        .await?;

    Ok(project)
}

pub async fn list_projects(db: &D1Database, organization_id: &str) -> CoreResult<Vec<models::Project>> {
    let result: D1Result = db
        .prepare(sql::LIST_PROJECTS)
        .bind(&[JsValue::from_str(organization_id)])?
        .all()
        .await?;

    all_rows(&result)
}

// ── Artifacts ───────────────────────────────────────────────────

/// Insert an artifact and its first version in one batch.
pub async fn create_artifact(
    db: &D1Database,
    caller: &Caller,
    body: &models::CreateArtifact,
) -> CoreResult<models::Artifact> {
    let created = artifacts::new_artifact(caller, body, &now_iso(), &mut new_id)?;

    db.batch(vec![
        insert_artifact(db, &created.artifact)?,
        insert_version(db, &created.initial_version)?,
    ])
    .await?;

    Ok(created.artifact)
}

pub async fn list_artifacts(db: &D1Database, organization_id: &str) -> CoreResult<Vec<models::Artifact>> {
    let result: D1Result = db
        .prepare(sql::LIST_ARTIFACTS)
        .bind(&[JsValue::from_str(organization_id)])?
        .all()
        .await?;

    let rows: Vec<ArtifactRow> = all_rows(&result)?;
    Ok(rows.into_iter().map(|r| r.into_artifact()).collect())
}

/// Artifact plus its full history, read in one batch.
pub async fn get_artifact(
    db: &D1Database,
    id: &str,
    organization_id: &str,
) -> CoreResult<models::ArtifactDetail> {
    let scope = [JsValue::from_str(id), JsValue::from_str(organization_id)];
    let results = db
        .batch(vec![
            db.prepare(sql::SELECT_ARTIFACT).bind(&scope)?,
            db.prepare(sql::SELECT_ARTIFACT_VERSIONS).bind(&scope)?,
        ])
        .await?;
    let mut results = results.into_iter();

    let artifact = all_rows::<ArtifactRow>(&next_result(&mut results)?)?
        .into_iter()
        .next()
        .ok_or(CoreError::NotFound("Artifact"))?
        .into_artifact();
    let versions = all_rows(&next_result(&mut results)?)?;

    Ok(models::ArtifactDetail { artifact, versions })
}

async fn find_artifact(
    db: &D1Database,
    id: &str,
    organization_id: &str,
) -> CoreResult<models::Artifact> {
    let row: Option<ArtifactRow> = db
        .prepare(sql::SELECT_ARTIFACT)
        .bind(&[JsValue::from_str(id), JsValue::from_str(organization_id)])?
        .first(None)
        .await?;
    row.map(ArtifactRow::into_artifact)
        .ok_or(CoreError::NotFound("Artifact"))
}

/// Apply a partial update. A content change writes the new version row in
/// the same batch as the artifact; a patch that changes nothing writes
/// nothing. The artifact's own change count decides `NotFound`; the version
/// row is only written when the update took effect.
pub async fn update_artifact(
    db: &D1Database,
    id: &str,
    organization_id: &str,
    patch: &models::UpdateArtifact,
) -> CoreResult<models::Artifact> {
    let current = find_artifact(db, id, organization_id).await?;
    let revision = artifacts::revise(&current, patch, &now_iso(), &mut new_id)?;
    if revision.is_noop(&current) {
        return Ok(current);
    }

    let a = &revision.artifact;
    let mut stmts = vec![db
        .prepare(sql::UPDATE_ARTIFACT)
        .bind(&[
            JsValue::from_str(&a.title),
            opt_str(&a.description),
            JsValue::from_str(&a.content),
            num(a.version),
            JsValue::from_str(&a.updated_at),
            JsValue::from_str(&a.id),
            JsValue::from_str(&a.organization_id),
        ])?];
    if let Some(version) = &revision.new_version {
        stmts.push(insert_version(db, version)?);
    }

    let results = db.batch(stmts).await?;
    match results.first() {
        Some(result) if changed(result)? => Ok(revision.artifact),
        _ => Err(CoreError::NotFound("Artifact")),
    }
}

/// Delete an artifact and its versions. Templates and SOP steps that name it
/// as their source keep the dangling reference.
pub async fn delete_artifact(db: &D1Database, id: &str, organization_id: &str) -> CoreResult<()> {
    let scope = [JsValue::from_str(id), JsValue::from_str(organization_id)];
    let results = db
        .batch(vec![
            db.prepare(sql::DELETE_ARTIFACT_VERSIONS).bind(&scope)?,
            db.prepare(sql::DELETE_ARTIFACT).bind(&scope)?,
        ])
        .await?;

    match results.last() {
        Some(result) if changed(result)? => Ok(()),
        _ => Err(CoreError::NotFound("Artifact")),
    }
}

fn insert_artifact(db: &D1Database, a: &models::Artifact) -> CoreResult<D1PreparedStatement> {
    Ok(db
        .prepare(sql::INSERT_ARTIFACT)
        .bind(&[
            JsValue::from_str(&a.id),
            JsValue::from_str(&a.title),
            opt_str(&a.description),
            JsValue::from_str(&a.content),
            JsValue::from_str(&a.organization_id),
            opt_str(&a.project_id),
            JsValue::from_str(&a.creator_id),
            num(a.version),
            flag(a.is_promoted_to_template),
            JsValue::from_str(&a.created_at),
            JsValue::from_str(&a.updated_at),
        ])?)
}

fn insert_version(db: &D1Database, v: &models::ArtifactVersion) -> CoreResult<D1PreparedStatement> {
    Ok(db
        .prepare(sql::INSERT_VERSION)
        .bind(&[
            JsValue::from_str(&v.id),
            JsValue::from_str(&v.artifact_id),
            num(v.version_number),
            JsValue::from_str(&v.content),
            opt_str(&v.change_summary),
            JsValue::from_str(&v.created_at),
        ])?)
}

// ── SOPs ────────────────────────────────────────────────────────

pub async fn create_sop(
    db: &D1Database,
    caller: &Caller,
    body: &models::CreateSop,
) -> CoreResult<models::SopDetail> {
    let detail = sops::compose(caller, body, &now_iso(), &mut new_id)?;

    let s = &detail.sop;
    let mut stmts = Vec::with_capacity(detail.steps.len() + 1);
    stmts.push(
        db.prepare(sql::INSERT_SOP).bind(&[
            JsValue::from_str(&s.id),
            JsValue::from_str(&s.title),
            opt_str(&s.description),
            JsValue::from_str(&s.organization_id),
            opt_str(&s.project_id),
            JsValue::from_str(&s.creator_id),
            num(s.version),
            JsValue::from_str(&s.created_at),
            JsValue::from_str(&s.updated_at),
        ])?,
    );
    for step in &detail.steps {
        stmts.push(
            db.prepare(sql::INSERT_SOP_STEP).bind(&[
                JsValue::from_str(&step.id),
                JsValue::from_str(&step.sop_id),
                num(step.step_number),
                JsValue::from_str(&step.title),
                opt_str(&step.description),
                opt_str(&step.source_artifact_id),
                JsValue::from_str(&step.created_at),
                JsValue::from_str(&step.updated_at),
            ])?,
        );
    }

    db.batch(stmts).await?;
    Ok(detail)
}

pub async fn list_sops(db: &D1Database, organization_id: &str) -> CoreResult<Vec<models::Sop>> {
    let result: D1Result = db
        .prepare(sql::LIST_SOPS)
        .bind(&[JsValue::from_str(organization_id)])?
        .all()
        .await?;

    all_rows(&result)
}

pub async fn get_sop(db: &D1Database, id: &str, organization_id: &str) -> CoreResult<models::SopDetail> {
    let scope = [JsValue::from_str(id), JsValue::from_str(organization_id)];
    let results = db
        .batch(vec![
            db.prepare(sql::SELECT_SOP).bind(&scope)?,
            db.prepare(sql::SELECT_SOP_STEPS).bind(&scope)?,
        ])
        .await?;
    let mut results = results.into_iter();

    let sop = all_rows::<models::Sop>(&next_result(&mut results)?)?
        .into_iter()
        .next()
        .ok_or(CoreError::NotFound("SOP"))?;
    let steps = all_rows(&next_result(&mut results)?)?;

    Ok(models::SopDetail { sop, steps })
}

pub async fn delete_sop(db: &D1Database, id: &str, organization_id: &str) -> CoreResult<()> {
    let scope = [JsValue::from_str(id), JsValue::from_str(organization_id)];
    let results = db
        .batch(vec![
            db.prepare(sql::DELETE_SOP_STEPS).bind(&scope)?,
            db.prepare(sql::DELETE_SOP).bind(&scope)?,
        ])
        .await?;

    match results.last() {
        Some(result) if changed(result)? => Ok(()),
        _ => Err(CoreError::NotFound("SOP")),
    }
}

// ── Templates ───────────────────────────────────────────────────

/// Snapshot an artifact of the caller's organization into a promoted
/// template and latch the artifact's promotion flag, in one batch.
pub async fn promote_artifact(
    db: &D1Database,
    caller: &Caller,
    body: &models::PromoteArtifact,
) -> CoreResult<models::Template> {
    let artifact = find_artifact(db, &body.artifact_id, &caller.organization_id).await?;
    let promotion = templates::promote(&artifact, &body.sanitization_checklist, &now_iso(), &mut new_id)?;

    db.batch(vec![
        insert_template(db, &promotion.template)?,
        db.prepare(sql::MARK_ARTIFACT_PROMOTED).bind(&[
            JsValue::from_str(&promotion.artifact.id),
            JsValue::from_str(&promotion.artifact.organization_id),
        ])?,
    ])
    .await?;

    console_log!(
        "promoted artifact {} to template {} in organization {}",
        artifact.id,
        promotion.template.id,
        promotion.template.organization_id
    );
    Ok(promotion.template)
}

pub async fn create_template(
    db: &D1Database,
    caller: &Caller,
    body: &models::CreateTemplate,
) -> CoreResult<models::Template> {
    let template = templates::author(caller, body, &now_iso(), &mut new_id)?;
    insert_template(db, &template)?.run().await?;
    Ok(template)
}

pub async fn list_templates(db: &D1Database, organization_id: &str) -> CoreResult<Vec<models::Template>> {
    let result: D1Result = db
        .prepare(sql::LIST_TEMPLATES)
        .bind(&[JsValue::from_str(organization_id)])?
        .all()
        .await?;

    let rows: Vec<TemplateRow> = all_rows(&result)?;
    rows.into_iter().map(TemplateRow::into_template).collect()
}

/// The caller's own templates, then every other organization's promoted
/// templates. Both sets come from one batch.
pub async fn template_gallery(db: &D1Database, organization_id: &str) -> CoreResult<Vec<models::Template>> {
    let org = [JsValue::from_str(organization_id)];
    let results = db
        .batch(vec![
            db.prepare(sql::LIST_TEMPLATES).bind(&org)?,
            db.prepare(sql::LIST_SHARED_TEMPLATES).bind(&org)?,
        ])
        .await?;
    let mut results = results.into_iter();

    let own: Vec<TemplateRow> = all_rows(&next_result(&mut results)?)?;
    let shared: Vec<TemplateRow> = all_rows(&next_result(&mut results)?)?;
    Ok(templates::gallery(
        organization_id,
        own.into_iter()
            .map(TemplateRow::into_template)
            .collect::<CoreResult<_>>()?,
        shared
            .into_iter()
            .map(TemplateRow::into_template)
            .collect::<CoreResult<_>>()?,
    ))
}

/// Copy a template into a new artifact of the caller's organization. The
/// template is looked up by id alone.
pub async fn import_template(
    db: &D1Database,
    caller: &Caller,
    body: &models::ImportTemplate,
) -> CoreResult<models::Artifact> {
    let row: Option<TemplateRow> = db
        .prepare(sql::SELECT_TEMPLATE_BY_ID)
        .bind(&[JsValue::from_str(&body.template_id)])?
        .first(None)
        .await?;
    let template = row
        .ok_or(CoreError::NotFound("Template"))?
        .into_template()?;

    let plan = templates::import(
        &template,
        caller,
        body.artifact_title.as_deref(),
        &now_iso(),
        &mut new_id,
    )?;
    let r = &plan.record;

    db.batch(vec![
        insert_artifact(db, &plan.created.artifact)?,
        insert_version(db, &plan.created.initial_version)?,
        db.prepare(sql::INSERT_TEMPLATE_IMPORT).bind(&[
            JsValue::from_str(&r.id),
            JsValue::from_str(&r.template_id),
            JsValue::from_str(&r.importing_org_id),
            JsValue::from_str(&r.imported_as_artifact_id),
            JsValue::from_str(&r.created_at),
        ])?,
    ])
    .await?;

    console_log!(
        "imported template {} into organization {} as artifact {}",
        r.template_id,
        r.importing_org_id,
        r.imported_as_artifact_id
    );
    Ok(plan.created.artifact)
}

/// Delete a template and its import records. Artifacts created by earlier
/// imports stay.
pub async fn delete_template(db: &D1Database, id: &str, organization_id: &str) -> CoreResult<()> {
    let scope = [JsValue::from_str(id), JsValue::from_str(organization_id)];
    let results = db
        .batch(vec![
            db.prepare(sql::DELETE_TEMPLATE_IMPORTS).bind(&scope)?,
            db.prepare(sql::DELETE_TEMPLATE).bind(&scope)?,
        ])
        .await?;

    match results.last() {
        Some(result) if changed(result)? => Ok(()),
        _ => Err(CoreError::NotFound("Template")),
    }
}

fn insert_template(db: &D1Database, t: &models::Template) -> CoreResult<D1PreparedStatement> {
    Ok(db
        .prepare(sql::INSERT_TEMPLATE)
        .bind(&[
            JsValue::from_str(&t.id),
            JsValue::from_str(&t.name),
            opt_str(&t.description),
            JsValue::from_str(&t.content),
            opt_str(&t.category),
            JsValue::from_str(&t.organization_id),
            opt_str(&t.source_artifact_id),
            opt_checklist(&t.sanitization_checklist)?,
            flag(t.is_promoted),
            JsValue::from_str(&t.created_at),
            JsValue::from_str(&t.updated_at),
        ])?)
}

// ── Internal row types ──────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct CountRow {
    count: i64,
}

#[derive(Debug, serde::Deserialize)]
struct UserRow {
    id: String,
    email: String,
    hashed_password: String,
    full_name: String,
    organization_id: String,
    is_active: i64,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn into_user(self) -> models::User {
        models::User {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            organization_id: self.organization_id,
            is_active: self.is_active != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ArtifactRow {
    id: String,
    title: String,
    description: Option<String>,
    content: String,
    organization_id: String,
    project_id: Option<String>,
    creator_id: String,
    version: i64,
    is_promoted_to_template: i64,
    created_at: String,
    updated_at: String,
}

impl ArtifactRow {
    fn into_artifact(self) -> models::Artifact {
        models::Artifact {
            id: self.id,
            title: self.title,
            description: self.description,
            content: self.content,
            organization_id: self.organization_id,
            project_id: self.project_id,
            creator_id: self.creator_id,
            version: self.version,
            is_promoted_to_template: self.is_promoted_to_template != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct TemplateRow {
    id: String,
    name: String,
    description: Option<String>,
    content: String,
    category: Option<String>,
    organization_id: String,
    source_artifact_id: Option<String>,
    sanitization_checklist: Option<String>,
    is_promoted: i64,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    /// A stored checklist that no longer parses is a storage fault, not an
    /// absent checklist.
    fn into_template(self) -> CoreResult<models::Template> {
        let sanitization_checklist = match self.sanitization_checklist {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|err| {
                Error::RustError(format!(
                    "template {} has an unreadable sanitization checklist: {err}",
                    self.id
                ))
            })?),
            None => None,
        };
        Ok(models::Template {
            id: self.id,
            name: self.name,
            description: self.description,
            content: self.content,
            category: self.category,
            organization_id: self.organization_id,
            source_artifact_id: self.source_artifact_id,
            sanitization_checklist,
            is_promoted: self.is_promoted != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
