use serde::Serialize;
use worker::*;

mod artifacts;
mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod sops;
mod templates;
mod tenant;

use config::{AllowedOrigins, Config};
use error::{CoreError, CoreResult};

#[derive(Serialize)]
struct HealthResponse<'a> {
    service: &'a str,
    status: &'a str,
}

#[event(fetch)]
pub async fn fetch(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    console_error_panic_hook::set_once();

    let cors = cors_for(&req, &AllowedOrigins::from_env(&env))?;
    if req.method() == Method::Options {
        return Response::empty()?.with_status(204).with_cors(&cors);
    }

    let config = match Config::from_env(&env) {
        Ok(config) => config,
        Err(err) => return error_response(&err)?.with_cors(&cors),
    };

    match router(config).run(req, env).await {
        Ok(response) => response.with_cors(&cors),
        Err(err) => error_response(&CoreError::from(err))?.with_cors(&cors),
    }
}

fn router(config: Config) -> Router<'static, Config> {
    Router::with_data(config)
        // health
        .get("/health", |_, _| {
            Response::from_json(&HealthResponse {
                service: "knowledge-fabric",
                status: "ok",
            })
        })
        // auth
        .post_async("/api/auth/register", |req, ctx| async move {
            respond(handlers::register(req, ctx).await)
        })
        .post_async("/api/auth/login", |req, ctx| async move {
            respond(handlers::login(req, ctx).await)
        })
        .post_async("/api/auth/refresh", |req, ctx| async move {
            respond(handlers::refresh(req, ctx).await)
        })
        .get_async("/api/auth/me", |req, ctx| async move {
            respond(handlers::me(req, ctx).await)
        })
        // projects
        .get_async("/api/projects", |req, ctx| async move {
            respond(handlers::list_projects(req, ctx).await)
        })
        .post_async("/api/projects", |req, ctx| async move {
            respond(handlers::create_project(req, ctx).await)
        })
        // artifacts
        .get_async("/api/artifacts", |req, ctx| async move {
            respond(handlers::list_artifacts(req, ctx).await)
        })
        .post_async("/api/artifacts", |req, ctx| async move {
            respond(handlers::create_artifact(req, ctx).await)
        })
        .get_async("/api/artifacts/:id", |req, ctx| async move {
            respond(handlers::get_artifact(req, ctx).await)
        })
        .put_async("/api/artifacts/:id", |req, ctx| async move {
            respond(handlers::update_artifact(req, ctx).await)
        })
        .delete_async("/api/artifacts/:id", |req, ctx| async move {
            respond(handlers::delete_artifact(req, ctx).await)
        })
        // sops
        .get_async("/api/sops", |req, ctx| async move {
            respond(handlers::list_sops(req, ctx).await)
        })
        .post_async("/api/sops", |req, ctx| async move {
            respond(handlers::create_sop(req, ctx).await)
        })
        .get_async("/api/sops/:id", |req, ctx| async move {
            respond(handlers::get_sop(req, ctx).await)
        })
        .delete_async("/api/sops/:id", |req, ctx| async move {
            respond(handlers::delete_sop(req, ctx).await)
        })
        // templates
        .get_async("/api/templates", |req, ctx| async move {
            respond(handlers::list_templates(req, ctx).await)
        })
        .post_async("/api/templates", |req, ctx| async move {
            respond(handlers::create_template(req, ctx).await)
        })
        .get_async("/api/templates/gallery", |req, ctx| async move {
            respond(handlers::template_gallery(req, ctx).await)
        })
        .post_async("/api/templates/promote", |req, ctx| async move {
            respond(handlers::promote_artifact(req, ctx).await)
        })
        .post_async("/api/templates/import", |req, ctx| async move {
            respond(handlers::import_template(req, ctx).await)
        })
        .delete_async("/api/templates/:id", |req, ctx| async move {
            respond(handlers::delete_template(req, ctx).await)
        })
}

/// CORS headers are only granted to origins on the allow-list.
fn cors_for(req: &Request, origins: &AllowedOrigins) -> Result<Cors> {
    let cors = Cors::new()
        .with_methods([
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Options,
        ])
        .with_allowed_headers(["authorization", "content-type"])
        .with_credentials(true)
        .with_max_age(86_400);

    Ok(match req.headers().get("origin")? {
        Some(origin) if origins.allows(&origin) => cors.with_origins([origin]),
        _ => cors,
    })
}

fn respond<T: Serialize>(result: CoreResult<T>) -> Result<Response> {
    match result {
        Ok(body) => Response::from_json(&body),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &CoreError) -> Result<Response> {
    let status = err.status();
    if status >= 500 {
        console_error!("request failed ({status}): {err}");
    } else {
        console_warn!("request rejected ({status}): {err}");
    }
    Ok(Response::from_json(&models::ErrorBody {
        detail: err.public_message(),
    })?
    .with_status(status))
}
