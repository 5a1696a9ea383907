//! Statements run against the D1 schema in `migrations/`. Placeholders are
//! positional (`?N`) and shared by D1 and SQLite.

macro_rules! user_columns {
    () => {
        "id, email, hashed_password, full_name, organization_id, is_active, created_at, updated_at"
    };
}

macro_rules! artifact_columns {
    () => {
        "id, title, description, content, organization_id, project_id, creator_id, version, is_promoted_to_template, created_at, updated_at"
    };
}

macro_rules! sop_columns {
    () => {
        "id, title, description, organization_id, project_id, creator_id, version, created_at, updated_at"
    };
}

macro_rules! template_columns {
    () => {
        "id, name, description, content, category, organization_id, source_artifact_id, sanitization_checklist, is_promoted, created_at, updated_at"
    };
}

// ── Organizations & users ───────────────────────────────────────

pub const COUNT_USERS_BY_EMAIL: &str = "SELECT COUNT(*) AS count FROM users WHERE email = ?1";

pub const COUNT_ORGANIZATIONS_BY_SLUG: &str =
    "SELECT COUNT(*) AS count FROM organizations WHERE slug = ?1";

pub const INSERT_ORGANIZATION: &str = "INSERT INTO organizations (id, name, slug, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5)";

pub const INSERT_USER: &str = "INSERT INTO users (id, email, hashed_password, full_name, organization_id, is_active, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

pub const SELECT_USER_BY_EMAIL: &str =
    concat!("SELECT ", user_columns!(), " FROM users WHERE email = ?1");

pub const SELECT_USER_BY_ID: &str = concat!("SELECT ", user_columns!(), " FROM users WHERE id = ?1");

// ── Projects ────────────────────────────────────────────────────

pub const INSERT_PROJECT: &str = "INSERT INTO projects (id, name, description, organization_id, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

pub const LIST_PROJECTS: &str = "SELECT id, name, description, organization_id, created_at, updated_at
     FROM projects WHERE organization_id = ?1 ORDER BY rowid";

// ── Artifacts ───────────────────────────────────────────────────

pub const INSERT_ARTIFACT: &str = "INSERT INTO artifacts (id, title, description, content, organization_id, project_id, creator_id, version, is_promoted_to_template, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

/// Inserts only while the artifact exists at `version_number`. Batched after
/// the artifact's insert or update, the row lands exactly when that write
/// did, and a concurrent delete yields no row instead of a foreign key error.
pub const INSERT_VERSION: &str = "INSERT INTO artifact_versions (id, artifact_id, version_number, content, change_summary, created_at)
     SELECT ?1, ?2, ?3, ?4, ?5, ?6
     WHERE EXISTS (SELECT 1 FROM artifacts WHERE id = ?2 AND version = ?3)";

pub const LIST_ARTIFACTS: &str = concat!(
    "SELECT ",
    artifact_columns!(),
    " FROM artifacts WHERE organization_id = ?1 ORDER BY rowid"
);

pub const SELECT_ARTIFACT: &str = concat!(
    "SELECT ",
    artifact_columns!(),
    " FROM artifacts WHERE id = ?1 AND organization_id = ?2"
);

pub const SELECT_ARTIFACT_VERSIONS: &str = "SELECT v.id, v.artifact_id, v.version_number, v.content, v.change_summary, v.created_at
     FROM artifact_versions v
     JOIN artifacts a ON a.id = v.artifact_id
     WHERE a.id = ?1 AND a.organization_id = ?2
     ORDER BY v.version_number ASC";

/// Never touches `is_promoted_to_template`; only promotion sets it.
pub const UPDATE_ARTIFACT: &str = "UPDATE artifacts SET title = ?1, description = ?2, content = ?3, version = ?4, updated_at = ?5
     WHERE id = ?6 AND organization_id = ?7";

pub const MARK_ARTIFACT_PROMOTED: &str =
    "UPDATE artifacts SET is_promoted_to_template = 1 WHERE id = ?1 AND organization_id = ?2";

pub const DELETE_ARTIFACT_VERSIONS: &str = "DELETE FROM artifact_versions WHERE artifact_id IN
     (SELECT id FROM artifacts WHERE id = ?1 AND organization_id = ?2)";

pub const DELETE_ARTIFACT: &str = "DELETE FROM artifacts WHERE id = ?1 AND organization_id = ?2";

// ── SOPs ────────────────────────────────────────────────────────

pub const INSERT_SOP: &str = "INSERT INTO sops (id, title, description, organization_id, project_id, creator_id, version, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

pub const INSERT_SOP_STEP: &str = "INSERT INTO sop_steps (id, sop_id, step_number, title, description, source_artifact_id, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

pub const LIST_SOPS: &str = concat!(
    "SELECT ",
    sop_columns!(),
    " FROM sops WHERE organization_id = ?1 ORDER BY rowid"
);

pub const SELECT_SOP: &str = concat!(
    "SELECT ",
    sop_columns!(),
    " FROM sops WHERE id = ?1 AND organization_id = ?2"
);

pub const SELECT_SOP_STEPS: &str = "SELECT st.id, st.sop_id, st.step_number, st.title, st.description, st.source_artifact_id, st.created_at, st.updated_at
     FROM sop_steps st
     JOIN sops s ON s.id = st.sop_id
     WHERE s.id = ?1 AND s.organization_id = ?2
     ORDER BY st.step_number ASC";

pub const DELETE_SOP_STEPS: &str = "DELETE FROM sop_steps WHERE sop_id IN
     (SELECT id FROM sops WHERE id = ?1 AND organization_id = ?2)";

pub const DELETE_SOP: &str = "DELETE FROM sops WHERE id = ?1 AND organization_id = ?2";

// ── Templates ───────────────────────────────────────────────────

pub const INSERT_TEMPLATE: &str = "INSERT INTO templates (id, name, description, content, category, organization_id, source_artifact_id, sanitization_checklist, is_promoted, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

/// Templates owned by `?1`, promoted or not.
pub const LIST_TEMPLATES: &str = concat!(
    "SELECT ",
    template_columns!(),
    " FROM templates WHERE organization_id = ?1 ORDER BY rowid"
);

/// Promoted templates owned by anyone but `?1`.
pub const LIST_SHARED_TEMPLATES: &str = concat!(
    "SELECT ",
    template_columns!(),
    " FROM templates WHERE organization_id != ?1 AND is_promoted = 1 ORDER BY rowid"
);

pub const SELECT_TEMPLATE_BY_ID: &str =
    concat!("SELECT ", template_columns!(), " FROM templates WHERE id = ?1");

pub const INSERT_TEMPLATE_IMPORT: &str = "INSERT INTO template_imports (id, template_id, importing_org_id, imported_as_artifact_id, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)";

pub const DELETE_TEMPLATE_IMPORTS: &str = "DELETE FROM template_imports WHERE template_id IN
     (SELECT id FROM templates WHERE id = ?1 AND organization_id = ?2)";

pub const DELETE_TEMPLATE: &str = "DELETE FROM templates WHERE id = ?1 AND organization_id = ?2";
