use super::common::*;

use crate::portal::{JobDraft, JobFilter, JobId, JobStatus, PortalError, Role, StatusFilter};

#[test]
fn post_job_assigns_sequential_ids_and_starts_active() {
    let seeded = seeded();
    assert_eq!(seeded.job.id, JobId(1));
    assert_eq!(seeded.job.status, JobStatus::Active);
    assert_eq!(seeded.job.company, "acme");

    let second = seeded
        .portal
        .jobs
        .post_job(&seeded.globex, "globex", job_draft("Data Intern"))
        .expect("globex posts");
    assert_eq!(second.id, JobId(2));
}

#[test]
fn post_job_trims_and_drops_blank_extras() {
    let seeded = seeded();
    let draft = JobDraft {
        title: "  Platform Intern ".to_string(),
        description: " Work on the platform ".to_string(),
        location: Some("   ".to_string()),
        ..JobDraft::default()
    };

    let job = seeded
        .portal
        .jobs
        .post_job(&seeded.acme, "acme", draft)
        .expect("posts");
    assert_eq!(job.title, "Platform Intern");
    assert_eq!(job.description, "Work on the platform");
    assert!(job.location.is_none());
}

#[test]
fn post_job_requires_title_and_description() {
    let seeded = seeded();

    let blank_title = JobDraft {
        title: " ".to_string(),
        ..job_draft("x")
    };
    assert!(matches!(
        seeded.portal.jobs.post_job(&seeded.acme, "acme", blank_title),
        Err(PortalError::Validation { field: "title", .. })
    ));

    let blank_description = JobDraft {
        description: String::new(),
        ..job_draft("x")
    };
    assert!(matches!(
        seeded
            .portal
            .jobs
            .post_job(&seeded.acme, "acme", blank_description),
        Err(PortalError::Validation {
            field: "description",
            ..
        })
    ));
}

#[test]
fn only_the_owning_company_or_an_admin_may_post() {
    let seeded = seeded();

    assert!(matches!(
        seeded
            .portal
            .jobs
            .post_job(&seeded.globex, "acme", job_draft("Spoofed")),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded
            .portal
            .jobs
            .post_job(&seeded.alice, "alice", job_draft("Student post")),
        Err(PortalError::PermissionDenied { .. })
    ));

    let by_admin = seeded
        .portal
        .jobs
        .post_job(&seeded.admin, "globex", job_draft("Posted for globex"))
        .expect("admin posts for a company");
    assert_eq!(by_admin.company, "globex");
}

#[test]
fn post_job_requires_a_registered_company() {
    let seeded = seeded();

    assert!(matches!(
        seeded
            .portal
            .jobs
            .post_job(&seeded.admin, "initech", job_draft("Ghost")),
        Err(PortalError::Validation {
            field: "company",
            ..
        })
    ));
    assert!(matches!(
        seeded
            .portal
            .jobs
            .post_job(&seeded.admin, "alice", job_draft("Wrong role")),
        Err(PortalError::Validation {
            field: "company",
            ..
        })
    ));
    assert_eq!(
        seeded.repository.state().expect("state").jobs.len(),
        1,
        "rejected postings are not stored"
    );
}

#[test]
fn list_jobs_filters_by_status_and_company() {
    let seeded = seeded();
    let closed = seeded
        .portal
        .jobs
        .post_job(&seeded.acme, "acme", job_draft("Closed role"))
        .expect("posts");
    seeded
        .portal
        .jobs
        .set_job_status(&seeded.acme, closed.id, JobStatus::Inactive)
        .expect("deactivates");
    seeded
        .portal
        .jobs
        .post_job(&seeded.globex, "globex", job_draft("Globex role"))
        .expect("posts");

    let active = seeded
        .portal
        .jobs
        .list_jobs(&JobFilter::default())
        .expect("lists");
    assert_eq!(active.len(), 2);
    assert!(active.iter().all(|job| job.status == JobStatus::Active));
    assert!(active[0].id > active[1].id, "newest first");

    let every_acme = seeded
        .portal
        .jobs
        .list_jobs(&JobFilter {
            company: Some("acme".to_string()),
            status: StatusFilter::All,
        })
        .expect("lists");
    assert_eq!(every_acme.len(), 2);

    let inactive = seeded
        .portal
        .jobs
        .list_jobs(&JobFilter {
            company: None,
            status: StatusFilter::Only(JobStatus::Inactive),
        })
        .expect("lists");
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].id, closed.id);
}

#[test]
fn set_job_status_is_idempotent() {
    let seeded = seeded();

    let first = seeded
        .portal
        .jobs
        .set_job_status(&seeded.acme, seeded.job.id, JobStatus::Active)
        .expect("no-op");
    let second = seeded
        .portal
        .jobs
        .set_job_status(&seeded.acme, seeded.job.id, JobStatus::Active)
        .expect("no-op again");
    assert_eq!(first, seeded.job);
    assert_eq!(second, seeded.job);

    let closed = seeded
        .portal
        .jobs
        .set_job_status(&seeded.acme, seeded.job.id, JobStatus::Inactive)
        .expect("deactivates");
    assert_eq!(closed.status, JobStatus::Inactive);
    assert_eq!(
        seeded
            .portal
            .jobs
            .get_job(seeded.job.id)
            .expect("reads")
            .map(|job| job.status),
        Some(JobStatus::Inactive)
    );
}

#[test]
fn set_job_status_checks_existence_then_ownership() {
    let seeded = seeded();

    assert!(matches!(
        seeded
            .portal
            .jobs
            .set_job_status(&seeded.globex, seeded.job.id, JobStatus::Inactive),
        Err(PortalError::PermissionDenied { .. })
    ));
    assert!(matches!(
        seeded
            .portal
            .jobs
            .set_job_status(&seeded.acme, JobId(99), JobStatus::Inactive),
        Err(PortalError::JobNotFound(JobId(99)))
    ));

    let reopened = seeded
        .portal
        .jobs
        .set_job_status(&seeded.admin, seeded.job.id, JobStatus::Inactive)
        .expect("admin may change any posting");
    assert_eq!(reopened.status, JobStatus::Inactive);
}

#[test]
fn get_job_returns_none_for_unknown_id() {
    let (portal, _) = build_portal();
    register(&portal, "acme", Role::Company);
    assert!(portal.jobs.get_job(JobId(7)).expect("reads").is_none());
}
