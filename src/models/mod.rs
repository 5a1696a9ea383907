//! Domain model for the knowledge fabric.
//!
//! Entities: Organization, User, Project, Artifact (+ ArtifactVersion),
//! Template (+ TemplateImport), Sop (+ SopStep).
//! Child rows point at their parent by id; parents never hold live children.

mod entities;
mod requests;

pub use entities::*;
pub use requests::*;

#[cfg(test)]
mod tests;
