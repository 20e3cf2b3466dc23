use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use serde_json::Value;

use crate::portal::router::ACTOR_HEADER;
use crate::portal::{
    Actor, ApplicationDraft, InMemoryPortalRepository, JobDraft, JobPosting, PasswordHasher,
    PlacementPortal, PortalRepository, Registration, RepositoryError, ReviewPolicy, Role,
    StoreReader, StoreTransaction,
};

pub(super) const PASSWORD: &str = "correct-horse-battery";
pub(super) const TEST_ITERATIONS: u32 = 1;
pub(super) const TEST_MEMORY_KIB: u32 = 64;

pub(super) type MemoryPortal = PlacementPortal<InMemoryPortalRepository>;

pub(super) fn build_portal() -> (MemoryPortal, Arc<InMemoryPortalRepository>) {
    build_portal_with(ReviewPolicy::Revisable, 10)
}

pub(super) fn build_portal_with(
    review_policy: ReviewPolicy,
    activity_limit: usize,
) -> (MemoryPortal, Arc<InMemoryPortalRepository>) {
    let repository = Arc::new(InMemoryPortalRepository::new());
    let portal = PlacementPortal::with_parts(
        repository.clone(),
        PasswordHasher::new(TEST_MEMORY_KIB, TEST_ITERATIONS),
        review_policy,
        activity_limit,
    );
    (portal, repository)
}

pub(super) fn registration(username: &str, role: Role) -> Registration {
    Registration {
        username: username.to_string(),
        password: PASSWORD.to_string(),
        role: Some(role),
        email: format!("{username}@example.com"),
        full_name: Some(format!("{username} full name")),
        organization: match role {
            Role::Company => Some(format!("{username} inc")),
            Role::Student => Some("State University".to_string()),
            Role::Admin => None,
        },
    }
}

pub(super) fn register<R>(portal: &PlacementPortal<R>, username: &str, role: Role) -> Actor
where
    R: PortalRepository + 'static,
{
    let view = portal
        .identity
        .register(registration(username, role))
        .expect("registration succeeds");
    Actor::from(&view)
}

pub(super) fn job_draft(title: &str) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        description: format!("{title} for the summer cohort"),
        location: Some("Remote".to_string()),
        job_type: Some("Internship".to_string()),
        duration: Some("3 months".to_string()),
        stipend: Some("1500/month".to_string()),
        requirements: Some("Rust".to_string()),
        deadline: None,
    }
}

pub(super) fn application_draft() -> ApplicationDraft {
    ApplicationDraft {
        resume_path: Some("resumes/alice.pdf".to_string()),
        cover_letter: Some("I would love to join.".to_string()),
        skills: Some("rust, sql".to_string()),
    }
}

/// Portal with an admin, two companies (acme, globex), two students (alice,
/// bob), and one Active posting by acme.
pub(super) struct Seeded {
    pub(super) portal: MemoryPortal,
    pub(super) repository: Arc<InMemoryPortalRepository>,
    pub(super) admin: Actor,
    pub(super) acme: Actor,
    pub(super) globex: Actor,
    pub(super) alice: Actor,
    pub(super) bob: Actor,
    pub(super) job: JobPosting,
}

pub(super) fn seeded() -> Seeded {
    seeded_with(ReviewPolicy::Revisable)
}

pub(super) fn seeded_with(review_policy: ReviewPolicy) -> Seeded {
    let (portal, repository) = build_portal_with(review_policy, 10);
    let admin = register(&portal, "admin", Role::Admin);
    let acme = register(&portal, "acme", Role::Company);
    let globex = register(&portal, "globex", Role::Company);
    let alice = register(&portal, "alice", Role::Student);
    let bob = register(&portal, "bob", Role::Student);
    let job = portal
        .jobs
        .post_job(&acme, "acme", job_draft("Backend Intern"))
        .expect("acme posts a job");

    Seeded {
        portal,
        repository,
        admin,
        acme,
        globex,
        alice,
        bob,
        job,
    }
}

pub(super) struct UnavailableRepository;

impl PortalRepository for UnavailableRepository {
    fn transaction<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(offline())
    }

    fn read<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreReader) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(offline())
    }
}

fn offline<E: From<RepositoryError>>() -> E {
    E::from(RepositoryError::Unavailable("database offline".to_string()))
}

pub(super) fn unavailable_portal() -> PlacementPortal<UnavailableRepository> {
    PlacementPortal::with_parts(
        Arc::new(UnavailableRepository),
        PasswordHasher::new(TEST_MEMORY_KIB, TEST_ITERATIONS),
        ReviewPolicy::default(),
        10,
    )
}

pub(super) fn json_request(
    method: Method,
    uri: &str,
    actor: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    }
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = read_body(response).await;
    serde_json::from_slice(&body).expect("json payload")
}
