//! Domain layer of the placement portal: identities, job postings,
//! applications, the access policy gating them, and admin reporting.

pub mod applications;
pub mod credentials;
pub mod domain;
pub mod identity;
pub mod jobs;
pub mod memory;
pub mod policy;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use applications::{ApplicationTracker, ReviewPolicy};
pub use credentials::PasswordHasher;
pub use domain::{
    Actor, Application, ApplicationDraft, ApplicationId, ApplicationStatus, ApplicationView,
    JobDraft, JobFilter, JobId, JobPosting, JobStatus, Registration, ReviewDecision, Role,
    StatusFilter, User, UserView,
};
pub use identity::IdentityService;
pub use jobs::JobRegistry;
pub use memory::InMemoryPortalRepository;
pub use policy::{can_perform, Action, Resource};
pub use report::{ExportEntity, ExportError, ReportingService};
pub use repository::{
    PortalRepository, PortalState, RepositoryError, StoreReader, StoreTransaction,
};
pub use router::portal_router;
pub use service::{PlacementPortal, PortalError};
