use crate::infra::Portal;
use crate::report::render_summary;
use clap::Args;
use placement_portal::config::PortalConfig;
use placement_portal::error::AppError;
use placement_portal::portal::{
    Actor, ApplicationDraft, ApplicationStatus, ApplicationView, ExportEntity,
    InMemoryPortalRepository, JobDraft, JobFilter, PlacementPortal, PortalError, Registration,
    ReviewDecision, ReviewPolicy, Role,
};
use std::io;
use std::sync::Arc;

const DEMO_PASSWORD: &str = "placement-demo";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Review policy to run the walkthrough under (revisable or terminal_once)
    #[arg(long, value_parser = parse_review_policy)]
    pub(crate) review_policy: Option<ReviewPolicy>,
    /// Print the applications export as CSV after the walkthrough
    #[arg(long)]
    pub(crate) csv: bool,
}

fn parse_review_policy(raw: &str) -> Result<ReviewPolicy, String> {
    raw.parse::<ReviewPolicy>().map_err(|err| err.to_string())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = PortalConfig {
        review_policy: args.review_policy.unwrap_or_default(),
        ..PortalConfig::default()
    };
    let portal = PlacementPortal::new(Arc::new(InMemoryPortalRepository::new()), &config);

    println!("Placement portal demo");
    println!("  review policy: {:?}", config.review_policy);
    let outcome = walkthrough(&portal)?;

    println!("\nFinal application states");
    for view in &outcome.applications {
        render_application(view);
    }

    println!();
    let summary = portal.reports.summary(&outcome.admin)?;
    render_summary(&summary.counts, &summary.recent_activity);

    if args.csv {
        println!("\napplications.csv");
        portal
            .reports
            .export_csv(&outcome.admin, ExportEntity::Applications, io::stdout().lock())?;
    }
    Ok(())
}

pub(crate) struct DemoOutcome {
    pub(crate) admin: Actor,
    pub(crate) applications: Vec<ApplicationView>,
}

/// acme posts an internship, alice and bob apply, acme approves alice and
/// rejects bob. Rejected attempts along the way are printed, not returned.
pub(crate) fn walkthrough(portal: &Portal) -> Result<DemoOutcome, AppError> {
    let admin = enroll(portal, "admin", Role::Admin, None)?;
    let acme = enroll(portal, "acme", Role::Company, Some("Acme Robotics"))?;
    let alice = enroll(portal, "alice", Role::Student, Some("State University"))?;
    let bob = enroll(portal, "bob", Role::Student, Some("City College"))?;
    println!("\nRegistered admin, acme, alice, and bob");

    let session = portal.identity.authenticate("alice", DEMO_PASSWORD)?;
    println!("alice signed in as {}", session.role);
    if let Err(err) = portal.identity.authenticate("alice", "not-the-password") {
        println!("wrong password refused: {err}");
    }

    let job = portal.jobs.post_job(
        &acme,
        "acme",
        JobDraft {
            title: "Software Engineering Intern".to_string(),
            description: "Ship backend features with the platform team".to_string(),
            location: Some("Remote".to_string()),
            job_type: Some("Internship".to_string()),
            duration: Some("12 weeks".to_string()),
            stipend: Some("2000/month".to_string()),
            requirements: Some("Rust or Go; SQL".to_string()),
            deadline: None,
        },
    )?;
    println!("acme posted job {} '{}'", job.id, job.title);

    let open = portal.jobs.list_jobs(&JobFilter::default())?;
    println!("{} open posting(s) visible to students", open.len());

    let alice_application = portal.applications.apply(
        &alice,
        "alice",
        job.id,
        ApplicationDraft {
            resume_path: Some("resumes/alice.pdf".to_string()),
            cover_letter: Some("I have built two CLI tools in Rust.".to_string()),
            skills: Some("rust, sql, git".to_string()),
        },
    )?;
    println!("alice applied (application {})", alice_application.id);

    if let Err(err) =
        portal
            .applications
            .apply(&alice, "alice", job.id, ApplicationDraft::default())
    {
        println!("second application refused: {err}");
    }

    let bob_application = portal.applications.apply(
        &bob,
        "bob",
        job.id,
        ApplicationDraft {
            skills: Some("python".to_string()),
            ..ApplicationDraft::default()
        },
    )?;
    println!("bob applied (application {})", bob_application.id);

    if let Err(err) = portal.applications.review(
        &bob,
        alice_application.id,
        ReviewDecision {
            status: ApplicationStatus::Rejected,
            feedback: None,
        },
    ) {
        println!("bob reviewing alice refused: {err}");
    }

    portal.applications.review(
        &acme,
        alice_application.id,
        ReviewDecision {
            status: ApplicationStatus::Approved,
            feedback: Some("Great portfolio, welcome aboard".to_string()),
        },
    )?;
    portal.applications.review(
        &acme,
        bob_application.id,
        ReviewDecision {
            status: ApplicationStatus::Rejected,
            feedback: Some("Looking for Rust experience".to_string()),
        },
    )?;
    println!("acme reviewed both applications");

    match portal.applications.review(
        &acme,
        bob_application.id,
        ReviewDecision {
            status: ApplicationStatus::Pending,
            feedback: None,
        },
    ) {
        Ok(_) => println!("acme reopened bob's application"),
        Err(err @ PortalError::InvalidTransition { .. }) => {
            println!("reopening bob's application refused: {err}")
        }
        Err(other) => return Err(other.into()),
    }

    let applications = portal.applications.list_for_company(&acme, "acme")?;
    Ok(DemoOutcome {
        admin,
        applications,
    })
}

fn enroll(
    portal: &Portal,
    username: &str,
    role: Role,
    organization: Option<&str>,
) -> Result<Actor, PortalError> {
    let view = portal.identity.register(Registration {
        username: username.to_string(),
        password: DEMO_PASSWORD.to_string(),
        role: Some(role),
        email: format!("{username}@portal.example"),
        full_name: None,
        organization: organization.map(str::to_string),
    })?;
    Ok(Actor::from(&view))
}

fn render_application(view: &ApplicationView) {
    println!(
        "  #{} {} -> {} at {}: {}",
        view.id, view.student, view.job_title, view.company, view.status_label
    );
    if let Some(feedback) = &view.feedback {
        println!("      feedback: {feedback}");
    }
}
