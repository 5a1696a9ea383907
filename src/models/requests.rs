use serde::{Deserialize, Serialize};

use super::SanitizationChecklist;

// ── Auth ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RegisterUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub organization_name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

// ── Projects ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

// ── Artifacts ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateArtifact {
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub project_id: Option<String>,
}

/// Partial update. An absent field means "leave unchanged"; an empty
/// `title` is also ignored while an empty `description` is applied.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateArtifact {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub change_summary: Option<String>,
}

// ── SOPs ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateSopStep {
    pub title: String,
    pub description: Option<String>,
    pub source_artifact_id: Option<String>,
}

/// Steps are numbered by their position in `steps`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateSop {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<String>,
    pub steps: Vec<CreateSopStep>,
}

// ── Templates ───────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PromoteArtifact {
    pub artifact_id: String,
    pub sanitization_checklist: SanitizationChecklist,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ImportTemplate {
    pub template_id: String,
    pub artifact_title: Option<String>,
}

// ── Generic response envelopes ──────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Deleted {
    pub status: String,
}

impl Deleted {
    pub fn confirmed() -> Self {
        Self {
            status: "deleted".into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub detail: String,
}
