//! Versioned document store.
//!
//! An artifact's `version` only moves when its content changes by value, and
//! each move appends exactly one immutable `ArtifactVersion`. Functions here
//! plan rows; `db` writes each plan in a single batch.

use crate::error::CoreResult;
use crate::models;
use crate::tenant::Caller;

pub const INITIAL_CHANGE_SUMMARY: &str = "Initial version";

/// Rows written together when an artifact is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArtifact {
    pub artifact: models::Artifact,
    pub initial_version: models::ArtifactVersion,
}

/// Outcome of applying a patch. `new_version` is set only on a content change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub artifact: models::Artifact,
    pub new_version: Option<models::ArtifactVersion>,
}

impl Revision {
    pub fn is_noop(&self, current: &models::Artifact) -> bool {
        self.new_version.is_none() && self.artifact == *current
    }
}

pub fn new_artifact(
    caller: &Caller,
    body: &models::CreateArtifact,
    now: &str,
    ids: &mut impl FnMut() -> CoreResult<String>,
) -> CoreResult<NewArtifact> {
    let artifact = models::Artifact {
        id: ids()?,
        title: body.title.clone(),
        description: body.description.clone(),
        content: body.content.clone(),
        organization_id: caller.organization_id.clone(),
        project_id: body.project_id.clone(),
        creator_id: caller.user_id.clone(),
        version: 1,
        is_promoted_to_template: false,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };
    let initial_version = models::ArtifactVersion {
        id: ids()?,
        artifact_id: artifact.id.clone(),
        version_number: 1,
        content: artifact.content.clone(),
        change_summary: Some(INITIAL_CHANGE_SUMMARY.to_string()),
        created_at: now.to_string(),
    };
    Ok(NewArtifact {
        artifact,
        initial_version,
    })
}

/// Apply a partial update to `current`.
///
/// - `content`: applied when present and different by value; bumps
///   `version` by one and yields the new version row.
/// - `title`: applied only when present and non-empty.
/// - `description`: applied whenever present, empty included.
///
/// `updated_at` moves only when something changed.
pub fn revise(
    current: &models::Artifact,
    patch: &models::UpdateArtifact,
    now: &str,
    ids: &mut impl FnMut() -> CoreResult<String>,
) -> CoreResult<Revision> {
    let mut artifact = current.clone();
    let mut new_version = None;

    if let Some(content) = patch.content.as_ref().filter(|c| **c != current.content) {
        artifact.version = current.version + 1;
        artifact.content = content.clone();
        new_version = Some(models::ArtifactVersion {
            id: ids()?,
            artifact_id: current.id.clone(),
            version_number: artifact.version,
            content: content.clone(),
            change_summary: patch.change_summary.clone(),
            created_at: now.to_string(),
        });
    }

    if let Some(title) = patch.title.as_ref().filter(|t| !t.is_empty()) {
        artifact.title = title.clone();
    }
    if let Some(description) = &patch.description {
        artifact.description = Some(description.clone());
    }

    if artifact != *current {
        artifact.updated_at = now.to_string();
    }
    Ok(Revision {
        artifact,
        new_version,
    })
}
