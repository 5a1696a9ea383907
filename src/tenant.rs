use crate::error::{CoreError, CoreResult};
use crate::models;
use worker::Request;

const AUTHORIZATION_HEADER: &str = "authorization";
const BEARER_SCHEME: &str = "bearer";

/// The authenticated principal. Every core operation is scoped to
/// `organization_id`; `user_id` is recorded as creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub organization_id: String,
}

impl Caller {
    pub fn of(user: &models::User) -> Self {
        Self {
            user_id: user.id.clone(),
            organization_id: user.organization_id.clone(),
        }
    }
}

pub fn bearer_token(req: &Request) -> CoreResult<String> {
    let header = req
        .headers()
        .get(AUTHORIZATION_HEADER)?
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::unauthenticated("Not authenticated"))?;
    parse_bearer(&header).map(ToString::to_string)
}

fn parse_bearer(value: &str) -> CoreResult<&str> {
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| CoreError::unauthenticated("Invalid authentication credentials"))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() {
        return Err(CoreError::unauthenticated("Invalid authentication credentials"));
    }
    Ok(token)
}

// ── Organizations & users ───────────────────────────────────────

/// Lowercase the name and turn every space into a hyphen. No other
/// normalization happens, so "Acme  Inc" and "Acme Inc" differ.
pub fn organization_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

pub fn validate_registration(body: &models::RegisterUser) -> CoreResult<()> {
    if !looks_like_email(&body.email) {
        return Err(CoreError::Validation("email is not a valid address".into()));
    }
    if body.password.is_empty() {
        return Err(CoreError::Validation("password must not be empty".into()));
    }
    if organization_slug(&body.organization_name).is_empty() {
        return Err(CoreError::Validation("organization_name must not be empty".into()));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn new_organization(id: String, name: &str, now: &str) -> models::Organization {
    models::Organization {
        id,
        name: name.to_string(),
        slug: organization_slug(name),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}

pub fn new_user(id: String, body: &models::RegisterUser, organization_id: &str, now: &str) -> models::User {
    models::User {
        id,
        email: body.email.clone(),
        full_name: body.full_name.clone(),
        organization_id: organization_id.to_string(),
        is_active: true,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}

pub fn new_project(id: String, caller: &Caller, body: &models::CreateProject, now: &str) -> models::Project {
    models::Project {
        id,
        name: body.name.clone(),
        description: body.description.clone(),
        organization_id: caller.organization_id.clone(),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}
