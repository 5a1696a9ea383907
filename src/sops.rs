//! Procedure composer: an SOP and its ordered steps, created together.

use crate::error::CoreResult;
use crate::models;
use crate::tenant::Caller;

/// Plan an SOP with steps numbered 1..=n in input order.
///
/// `source_artifact_id` on a step is copied as given; it is not checked
/// for existence or organization.
pub fn compose(
    caller: &Caller,
    body: &models::CreateSop,
    now: &str,
    ids: &mut impl FnMut() -> CoreResult<String>,
) -> CoreResult<models::SopDetail> {
    let sop = models::Sop {
        id: ids()?,
        title: body.title.clone(),
        description: body.description.clone(),
        organization_id: caller.organization_id.clone(),
        project_id: body.project_id.clone(),
        creator_id: caller.user_id.clone(),
        version: 1,
        created_at: now.to_string(),
        updated_at: now.to_string(),
    };

    let steps = body
        .steps
        .iter()
        .zip(1..)
        .map(|(step, step_number)| -> CoreResult<models::SopStep> {
            Ok(models::SopStep {
                id: ids()?,
                sop_id: sop.id.clone(),
                step_number,
                title: step.title.clone(),
                description: step.description.clone(),
                source_artifact_id: step.source_artifact_id.clone(),
                created_at: now.to_string(),
                updated_at: now.to_string(),
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(models::SopDetail { sop, steps })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller() -> Caller {
        Caller {
            user_id: "u1".into(),
            organization_id: "org-1".into(),
        }
    }

    fn counter() -> impl FnMut() -> CoreResult<String> {
        let mut n = 0;
        move || {
            n += 1;
            Ok(format!("id-{n}"))
        }
    }

    fn step(title: &str, source: Option<&str>) -> models::CreateSopStep {
        models::CreateSopStep {
            title: title.into(),
            description: None,
            source_artifact_id: source.map(Into::into),
        }
    }

    fn body(steps: Vec<models::CreateSopStep>) -> models::CreateSop {
        models::CreateSop {
            title: "Deploy".into(),
            description: None,
            project_id: Some("p1".into()),
            steps,
        }
    }

    #[test]
    fn steps_are_numbered_in_input_order() {
        let detail = compose(
            &caller(),
            &body(vec![step("Step A", None), step("Step B", None), step("Step C", None)]),
            "t0",
            &mut counter(),
        )
        .unwrap();
        let numbered: Vec<_> = detail
            .steps
            .iter()
            .map(|s| (s.step_number, s.title.as_str()))
            .collect();
        assert_eq!(numbered, vec![(1, "Step A"), (2, "Step B"), (3, "Step C")]);
        assert!(detail.steps.iter().all(|s| s.sop_id == detail.sop.id));
    }

    #[test]
    fn duplicate_titles_are_kept() {
        let detail = compose(
            &caller(),
            &body(vec![step("Check", None), step("Check", None)]),
            "t0",
            &mut counter(),
        )
        .unwrap();
        assert_eq!(detail.steps.len(), 2);
        assert_eq!(detail.steps[1].step_number, 2);
    }

    #[test]
    fn sop_without_steps_is_allowed() {
        let detail = compose(&caller(), &body(vec![]), "t0", &mut counter()).unwrap();
        assert!(detail.steps.is_empty());
        assert_eq!(detail.sop.version, 1);
    }

    #[test]
    fn sop_is_scoped_to_callers_org() {
        let detail = compose(&caller(), &body(vec![step("A", None)]), "t0", &mut counter()).unwrap();
        assert_eq!(detail.sop.organization_id, "org-1");
        assert_eq!(detail.sop.creator_id, "u1");
        assert_eq!(detail.sop.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn source_artifact_reference_is_copied_unchecked() {
        let detail = compose(
            &caller(),
            &body(vec![step("A", Some("artifact-from-elsewhere")), step("B", None)]),
            "t0",
            &mut counter(),
        )
        .unwrap();
        assert_eq!(
            detail.steps[0].source_artifact_id.as_deref(),
            Some("artifact-from-elsewhere")
        );
        assert!(detail.steps[1].source_artifact_id.is_none());
    }

    #[test]
    fn every_row_gets_its_own_id() {
        let detail = compose(
            &caller(),
            &body(vec![step("A", None), step("B", None)]),
            "t0",
            &mut counter(),
        )
        .unwrap();
        let mut ids: Vec<_> = std::iter::once(detail.sop.id.clone())
            .chain(detail.steps.iter().map(|s| s.id.clone()))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
