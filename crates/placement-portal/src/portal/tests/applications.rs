use super::common::*;

use crate::portal::{
    ApplicationDraft, ApplicationId, ApplicationStatus, JobId, JobStatus, PortalError,
    ReviewDecision, ReviewPolicy,
};

fn decision(status: ApplicationStatus, feedback: Option<&str>) -> ReviewDecision {
    ReviewDecision {
        status,
        feedback: feedback.map(str::to_string),
    }
}

#[test]
fn student_applies_and_company_approves() {
    let seeded = seeded();

    let application = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("alice applies");
    assert_eq!(application.id, ApplicationId(1));
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert!(application.reviewed_by.is_none());

    let inbox = seeded
        .portal
        .applications
        .list_for_company(&seeded.acme, "acme")
        .expect("acme lists");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].student, "alice");
    assert_eq!(inbox[0].student_email.as_deref(), Some("alice@example.com"));
    assert_eq!(inbox[0].job_title, "Backend Intern");

    let reviewed = seeded
        .portal
        .applications
        .review(
            &seeded.acme,
            application.id,
            decision(ApplicationStatus::Approved, Some("Welcome aboard")),
        )
        .expect("acme approves");
    assert_eq!(reviewed.status, ApplicationStatus::Approved);
    assert_eq!(reviewed.reviewed_by.as_deref(), Some("acme"));
    assert!(reviewed.reviewed_at.is_some());

    let mine = seeded
        .portal
        .applications
        .list_for_student(&seeded.alice, "alice")
        .expect("alice lists");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, ApplicationStatus::Approved);
    assert_eq!(mine[0].status_label, "Approved");
    assert_eq!(mine[0].feedback.as_deref(), Some("Welcome aboard"));
    assert_eq!(mine[0].company, "acme");
}

#[test]
fn second_application_to_the_same_job_is_rejected() {
    let seeded = seeded();
    seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("first application");

    let err = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, ApplicationDraft::default())
        .expect_err("duplicate rejected");
    assert!(matches!(err, PortalError::AlreadyApplied(id) if id == seeded.job.id));

    let state = seeded.repository.state().expect("state");
    assert_eq!(state.applications.len(), 1);
}

#[test]
fn duplicate_check_runs_before_the_job_checks() {
    let seeded = seeded();
    seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("first application");
    seeded
        .portal
        .jobs
        .set_job_status(&seeded.acme, seeded.job.id, JobStatus::Inactive)
        .expect("closes");

    assert!(matches!(
        seeded.portal.applications.apply(
            &seeded.alice,
            "alice",
            seeded.job.id,
            application_draft()
        ),
        Err(PortalError::AlreadyApplied(_))
    ));
}

#[test]
fn inactive_and_missing_jobs_refuse_applications() {
    let seeded = seeded();
    seeded
        .portal
        .jobs
        .set_job_status(&seeded.acme, seeded.job.id, JobStatus::Inactive)
        .expect("closes");

    assert!(matches!(
        seeded.portal.applications.apply(
            &seeded.alice,
            "alice",
            seeded.job.id,
            application_draft()
        ),
        Err(PortalError::JobClosed(_))
    ));
    assert!(matches!(
        seeded.portal.applications.apply(
            &seeded.admin,
            "bob",
            seeded.job.id,
            application_draft()
        ),
        Err(PortalError::JobClosed(_))
    ));
    assert!(matches!(
        seeded
            .portal
            .applications
            .apply(&seeded.alice, "alice", JobId(42), application_draft()),
        Err(PortalError::JobNotFound(JobId(42)))
    ));
    assert!(seeded
        .repository
        .state()
        .expect("state")
        .applications
        .is_empty());
}

#[test]
fn applicants_must_be_themselves_and_students() {
    let seeded = seeded();

    assert!(matches!(
        seeded
            .portal
            .applications
            .apply(&seeded.bob, "alice", seeded.job.id, application_draft()),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded
            .portal
            .applications
            .apply(&seeded.acme, "acme", seeded.job.id, application_draft()),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded
            .portal
            .applications
            .apply(&seeded.admin, "globex", seeded.job.id, application_draft()),
        Err(PortalError::Validation {
            field: "student",
            ..
        })
    ));
}

#[test]
fn non_owning_company_cannot_review() {
    let seeded = seeded();
    let application = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("applies");

    assert!(matches!(
        seeded.portal.applications.review(
            &seeded.globex,
            application.id,
            decision(ApplicationStatus::Rejected, None)
        ),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded.portal.applications.review(
            &seeded.alice,
            application.id,
            decision(ApplicationStatus::Approved, None)
        ),
        Err(PortalError::PermissionDenied { .. })
    ));

    let stored = seeded
        .portal
        .applications
        .get_application(&seeded.admin, application.id)
        .expect("admin reads");
    assert_eq!(stored.status, ApplicationStatus::Pending);
    assert!(stored.reviewed_by.is_none());
}

#[test]
fn revisable_policy_allows_re_review() {
    let seeded = seeded();
    let application = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("applies");

    seeded
        .portal
        .applications
        .review(
            &seeded.acme,
            application.id,
            decision(ApplicationStatus::Approved, Some("Great fit")),
        )
        .expect("approves");
    let revised = seeded
        .portal
        .applications
        .review(
            &seeded.admin,
            application.id,
            decision(ApplicationStatus::Rejected, Some("  ")),
        )
        .expect("admin revises");

    assert_eq!(revised.status, ApplicationStatus::Rejected);
    assert!(revised.feedback.is_none());
    assert_eq!(revised.reviewed_by.as_deref(), Some("admin"));
}

#[test]
fn terminal_once_policy_rejects_leaving_a_final_state() {
    let seeded = seeded_with(ReviewPolicy::TerminalOnce);
    let application = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("applies");

    seeded
        .portal
        .applications
        .review(
            &seeded.acme,
            application.id,
            decision(ApplicationStatus::Approved, None),
        )
        .expect("approves");

    let err = seeded
        .portal
        .applications
        .review(
            &seeded.acme,
            application.id,
            decision(ApplicationStatus::Rejected, None),
        )
        .expect_err("final state");
    assert!(matches!(
        err,
        PortalError::InvalidTransition {
            from: ApplicationStatus::Approved,
            to: ApplicationStatus::Rejected,
        }
    ));

    let unchanged = seeded
        .portal
        .applications
        .review(
            &seeded.acme,
            application.id,
            decision(ApplicationStatus::Approved, Some("Confirmed")),
        )
        .expect("same status is allowed");
    assert_eq!(unchanged.feedback.as_deref(), Some("Confirmed"));
}

#[test]
fn review_reports_missing_application() {
    let seeded = seeded();
    assert!(matches!(
        seeded.portal.applications.review(
            &seeded.acme,
            ApplicationId(9),
            decision(ApplicationStatus::Approved, None)
        ),
        Err(PortalError::ApplicationNotFound(ApplicationId(9)))
    ));
}

#[test]
fn application_reads_follow_ownership() {
    let seeded = seeded();
    let application = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("applies");

    let own = seeded
        .portal
        .applications
        .get_application(&seeded.alice, application.id)
        .expect("student reads own");
    assert_eq!(own.resume_path.as_deref(), Some("resumes/alice.pdf"));

    seeded
        .portal
        .applications
        .get_application(&seeded.acme, application.id)
        .expect("owning company reads");

    assert!(matches!(
        seeded
            .portal
            .applications
            .get_application(&seeded.bob, application.id),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded
            .portal
            .applications
            .get_application(&seeded.globex, application.id),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded
            .portal
            .applications
            .list_for_student(&seeded.bob, "alice"),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded
            .portal
            .applications
            .list_for_company(&seeded.globex, "acme"),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded.portal.applications.list_all(&seeded.acme),
        Err(PortalError::PermissionDenied { .. })
    ));
}

#[test]
fn listings_are_newest_first_and_scoped() {
    let seeded = seeded();
    let second_job = seeded
        .portal
        .jobs
        .post_job(&seeded.globex, "globex", job_draft("Data Intern"))
        .expect("posts");

    let first = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", seeded.job.id, application_draft())
        .expect("applies");
    let second = seeded
        .portal
        .applications
        .apply(&seeded.alice, "alice", second_job.id, application_draft())
        .expect("applies");
    seeded
        .portal
        .applications
        .apply(&seeded.bob, "bob", seeded.job.id, ApplicationDraft::default())
        .expect("applies");

    let alice = seeded
        .portal
        .applications
        .list_for_student(&seeded.alice, "alice")
        .expect("lists");
    assert_eq!(
        alice.iter().map(|view| view.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    let globex = seeded
        .portal
        .applications
        .list_for_company(&seeded.globex, "globex")
        .expect("lists");
    assert_eq!(globex.len(), 1);
    assert_eq!(globex[0].id, second.id);

    let everything = seeded
        .portal
        .applications
        .list_all(&seeded.admin)
        .expect("admin lists");
    assert_eq!(everything.len(), 3);
}

#[test]
fn review_policy_parses_config_keywords() {
    assert_eq!(
        "revisable".parse::<ReviewPolicy>().expect("parses"),
        ReviewPolicy::Revisable
    );
    assert_eq!(
        "Terminal-Once".parse::<ReviewPolicy>().expect("parses"),
        ReviewPolicy::TerminalOnce
    );
    assert!("strict".parse::<ReviewPolicy>().is_err());
    assert!(ReviewPolicy::TerminalOnce.permits(ApplicationStatus::Pending, ApplicationStatus::Rejected));
    assert!(!ReviewPolicy::TerminalOnce.permits(ApplicationStatus::Rejected, ApplicationStatus::Pending));
}

#[test]
fn simultaneous_applications_store_one_row() {
    let seeded = seeded();
    let attempts = 16;

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..attempts)
            .map(|_| {
                scope.spawn(|| {
                    seeded.portal.applications.apply(
                        &seeded.alice,
                        "alice",
                        seeded.job.id,
                        application_draft(),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("apply thread"))
            .collect()
    });

    let accepted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(accepted, 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|err| matches!(err, PortalError::AlreadyApplied(_))));

    let state = seeded.repository.state().expect("state");
    assert_eq!(state.applications.len(), 1);
}
