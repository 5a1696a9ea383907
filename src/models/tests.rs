use super::*;

fn artifact() -> Artifact {
    Artifact {
        id: "a1".into(),
        title: "Incident runbook".into(),
        description: None,
        content: "page the on-call".into(),
        organization_id: "org-1".into(),
        project_id: None,
        creator_id: "u1".into(),
        version: 2,
        is_promoted_to_template: false,
        created_at: "2026-01-01T00:00:00Z".into(),
        updated_at: "2026-01-02T00:00:00Z".into(),
    }
}

// ── Detail views ────────────────────────────────────────────────

#[test]
fn artifact_detail_flattens_artifact_fields() {
    let detail = ArtifactDetail {
        artifact: artifact(),
        versions: vec![ArtifactVersion {
            id: "v1".into(),
            artifact_id: "a1".into(),
            version_number: 1,
            content: "draft".into(),
            change_summary: Some("Initial version".into()),
            created_at: "2026-01-01T00:00:00Z".into(),
        }],
    };
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["id"], "a1");
    assert_eq!(json["version"], 2);
    assert_eq!(json["is_promoted_to_template"], false);
    assert_eq!(json["versions"][0]["version_number"], 1);
    assert_eq!(json["versions"][0]["change_summary"], "Initial version");
}

#[test]
fn sop_detail_flattens_sop_fields() {
    let detail = SopDetail {
        sop: Sop {
            id: "s1".into(),
            title: "Onboarding".into(),
            description: None,
            organization_id: "org-1".into(),
            project_id: None,
            creator_id: "u1".into(),
            version: 1,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        },
        steps: vec![],
    };
    let json = serde_json::to_value(&detail).unwrap();
    assert_eq!(json["title"], "Onboarding");
    assert!(json["steps"].as_array().unwrap().is_empty());
}

// ── Requests ────────────────────────────────────────────────────

#[test]
fn update_artifact_missing_fields_are_none() {
    let patch: UpdateArtifact = serde_json::from_str(r#"{"content": "v2"}"#).unwrap();
    assert_eq!(patch.content.as_deref(), Some("v2"));
    assert!(patch.title.is_none());
    assert!(patch.description.is_none());
    assert!(patch.change_summary.is_none());
}

#[test]
fn update_artifact_keeps_explicit_empty_description() {
    let patch: UpdateArtifact = serde_json::from_str(r#"{"description": "", "title": ""}"#).unwrap();
    assert_eq!(patch.description.as_deref(), Some(""));
    assert_eq!(patch.title.as_deref(), Some(""));
}

#[test]
fn create_sop_ignores_client_ordering_fields() {
    let body: CreateSop = serde_json::from_str(
        r#"{
            "title": "Release",
            "steps": [
                {"title": "Step A", "step_number": 3},
                {"title": "Step B", "step_number": 1, "source_artifact_id": "a9"},
                {"title": "Step C", "order": 0}
            ]
        }"#,
    )
    .unwrap();
    let titles: Vec<_> = body.steps.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["Step A", "Step B", "Step C"]);
    assert_eq!(body.steps[1].source_artifact_id.as_deref(), Some("a9"));
}

#[test]
fn promote_accepts_free_form_checklist() {
    let body: PromoteArtifact = serde_json::from_str(
        r#"{
            "artifact_id": "a1",
            "sanitization_checklist": {
                "Removed sensitive data": true,
                "Anonymized examples": false,
                "custom item": true
            }
        }"#,
    )
    .unwrap();
    assert_eq!(body.sanitization_checklist.len(), 3);
    assert_eq!(body.sanitization_checklist.get("Anonymized examples"), Some(&false));
}

#[test]
fn promote_rejects_non_boolean_checklist_values() {
    let parsed: Result<PromoteArtifact, _> = serde_json::from_str(
        r#"{"artifact_id": "a1", "sanitization_checklist": {"Removed sensitive data": "yes"}}"#,
    );
    assert!(parsed.is_err());
}

#[test]
fn import_title_override_is_optional() {
    let body: ImportTemplate = serde_json::from_str(r#"{"template_id": "t1"}"#).unwrap();
    assert!(body.artifact_title.is_none());
}

// ── Templates ───────────────────────────────────────────────────

#[test]
fn direct_template_serializes_absent_provenance_as_null() {
    let template = Template {
        id: "t1".into(),
        name: "Checklist".into(),
        description: None,
        content: "- [ ] item".into(),
        category: Some("Ops".into()),
        organization_id: "org-1".into(),
        source_artifact_id: None,
        sanitization_checklist: None,
        is_promoted: false,
        created_at: "2026-01-01T00:00:00Z".into(),
        updated_at: "2026-01-01T00:00:00Z".into(),
    };
    let json = serde_json::to_value(&template).unwrap();
    assert!(json["source_artifact_id"].is_null());
    assert!(json["sanitization_checklist"].is_null());
    assert_eq!(json["is_promoted"], false);
}

#[test]
fn deleted_envelope_shape() {
    let json = serde_json::to_string(&Deleted::confirmed()).unwrap();
    assert_eq!(json, r#"{"status":"deleted"}"#);
}
