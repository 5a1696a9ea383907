use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What was scrubbed from an artifact before it became a template, keyed by
/// checklist item. Free-form: no fixed schema is enforced.
pub type SanitizationChecklist = BTreeMap<String, bool>;

// ── Tenancy ─────────────────────────────────────────────────────

/// Tenancy root. Every other entity belongs to exactly one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub organization_id: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Optional grouping container for artifacts and SOPs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub organization_id: String,
    pub created_at: String,
    pub updated_at: String,
}

// ── Artifacts ───────────────────────────────────────────────────

/// A versioned document. `content` is always the latest version's content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub organization_id: String,
    pub project_id: Option<String>,
    pub creator_id: String,
    pub version: i64,
    /// Set on first promotion, never cleared.
    pub is_promoted_to_template: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Immutable snapshot of an artifact's content at one version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub id: String,
    pub artifact_id: String,
    pub version_number: i64,
    pub content: String,
    pub change_summary: Option<String>,
    pub created_at: String,
}

/// Artifact with its history, oldest version first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactDetail {
    #[serde(flatten)]
    pub artifact: Artifact,
    pub versions: Vec<ArtifactVersion>,
}

// ── Templates ───────────────────────────────────────────────────

/// A shareable snapshot. `source_artifact_id` records provenance only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub category: Option<String>,
    pub organization_id: String,
    pub source_artifact_id: Option<String>,
    pub sanitization_checklist: Option<SanitizationChecklist>,
    /// Promoted templates are visible in every organization's gallery.
    pub is_promoted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Append-only audit record of one template import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateImport {
    pub id: String,
    pub template_id: String,
    pub importing_org_id: String,
    pub imported_as_artifact_id: String,
    pub created_at: String,
}

// ── SOPs ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sop {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub organization_id: String,
    pub project_id: Option<String>,
    pub creator_id: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SopStep {
    pub id: String,
    pub sop_id: String,
    pub step_number: i64,
    pub title: String,
    pub description: Option<String>,
    pub source_artifact_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// SOP with its steps ordered by `step_number`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SopDetail {
    #[serde(flatten)]
    pub sop: Sop,
    pub steps: Vec<SopStep>,
}
