//! Template promotion and import: the only paths where content crosses an
//! organization boundary.
//!
//! - Promotion snapshots an artifact into a template owned by the same
//!   organization and latches `is_promoted_to_template` on the artifact.
//! - The gallery is an allow-list: the caller's own templates plus other
//!   organizations' templates with `is_promoted` set.
//! - Import copies a template into a brand-new artifact owned by the
//!   importing organization and appends an audit record.

use crate::artifacts::{self, NewArtifact};
use crate::error::CoreResult;
use crate::models;
use crate::tenant::Caller;

pub const PROMOTED_CATEGORY: &str = "Promoted";

/// Rows written together by a promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub template: models::Template,
    /// Source artifact with its promotion latch set.
    pub artifact: models::Artifact,
}

/// Rows written together by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub created: NewArtifact,
    pub record: models::TemplateImport,
}

/// Snapshot `artifact` into a new promoted template.
///
/// Promoting the same artifact again yields another, independent template.
pub fn promote(
    artifact: &models::Artifact,
    checklist: &models::SanitizationChecklist,
    now: &str,
    ids: &mut impl FnMut() -> CoreResult<String>,
) -> CoreResult<Promotion> {
    let template = models::Template {
        id: ids()?,
        name: artifact.title.clone(),
        description: artifact.description.clone(),
        content: artifact.content.clone(),
        category: Some(PROMOTED_CATEGORY.to_string()),
        organization_id: artifact.organization_id.clone(),
        source_artifact_id: Some(artifact.id.clone()),
        sanitization_checklist: Some(checklist.clone()),
        is_promoted: true,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };
    let mut artifact = artifact.clone();
    artifact.is_promoted_to_template = true;
    Ok(Promotion { template, artifact })
}

/// A template authored directly: caller-chosen category, no provenance,
/// never promoted.
pub fn author(
    caller: &Caller,
    body: &models::CreateTemplate,
    now: &str,
    ids: &mut impl FnMut() -> CoreResult<String>,
) -> CoreResult<models::Template> {
    Ok(models::Template {
        id: ids()?,
        name: body.name.clone(),
        description: body.description.clone(),
        content: body.content.clone(),
        category: body.category.clone(),
        organization_id: caller.organization_id.clone(),
        source_artifact_id: None,
        sanitization_checklist: None,
        is_promoted: false,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    })
}

/// Plan the import of `template` into the caller's organization.
///
/// The template's owner and promotion flag are not consulted. An empty
/// `artifact_title` falls back to the template name.
pub fn import(
    template: &models::Template,
    caller: &Caller,
    artifact_title: Option<&str>,
    now: &str,
    ids: &mut impl FnMut() -> CoreResult<String>,
) -> CoreResult<Import> {
    let title = artifact_title
        .filter(|t| !t.is_empty())
        .unwrap_or(&template.name);
    let seed = models::CreateArtifact {
        title: title.to_string(),
        description: template.description.clone(),
        content: template.content.clone(),
        project_id: None,
    };
    let created = artifacts::new_artifact(caller, &seed, now, ids)?;
    let record = models::TemplateImport {
        id: ids()?,
        template_id: template.id.clone(),
        importing_org_id: caller.organization_id.clone(),
        imported_as_artifact_id: created.artifact.id.clone(),
        created_at: now.to_string(),
    };
    Ok(Import { created, record })
}

/// Assemble the gallery for `organization_id`: its own templates first, then
/// promoted templates of other organizations. Rows outside the allow-list
/// are dropped.
pub fn gallery(
    organization_id: &str,
    own: Vec<models::Template>,
    shared: Vec<models::Template>,
) -> Vec<models::Template> {
    own.into_iter()
        .filter(|t| t.organization_id == organization_id)
        .chain(
            shared
                .into_iter()
                .filter(|t| t.organization_id != organization_id && t.is_promoted),
        )
        .collect()
}
