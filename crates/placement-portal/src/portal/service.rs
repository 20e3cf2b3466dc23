use std::sync::Arc;

use tracing::{debug, error, warn};

use super::applications::{ApplicationTracker, ReviewPolicy};
use super::credentials::PasswordHasher;
use super::domain::{Actor, ApplicationId, ApplicationStatus, JobId};
use super::identity::IdentityService;
use super::jobs::JobRegistry;
use super::policy::{can_perform, Action, Resource};
use super::report::ReportingService;
use super::repository::{PortalRepository, RepositoryError};
use crate::config::PortalConfig;

/// Error raised by the portal services.
///
/// Storage failures display as a generic message; the underlying detail stays
/// on the `source` chain and in the logs.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{field} {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("username is already taken")]
    DuplicateUsername,
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("already applied to job {0}")]
    AlreadyApplied(JobId),
    #[error("job {0} is not accepting applications")]
    JobClosed(JobId),
    #[error("not permitted to {}", .action.label())]
    PermissionDenied { action: Action },
    #[error("application cannot move from {} to {}", .from.label(), .to.label())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("service unavailable, please try again later")]
    Unavailable(#[source] RepositoryError),
    #[error("unable to secure password")]
    Hashing(#[source] argon2::password_hash::Error),
}

impl PortalError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn denied(action: Action) -> Self {
        Self::PermissionDenied { action }
    }
}

impl From<RepositoryError> for PortalError {
    fn from(value: RepositoryError) -> Self {
        Self::Unavailable(value)
    }
}

/// Log a failed operation: storage faults at error level with their detail,
/// everything else at debug.
pub(crate) fn trace_failure(operation: &'static str) -> impl Fn(&PortalError) {
    move |err| match err {
        PortalError::Unavailable(source) => {
            error!(operation, error = %source, "portal storage failure");
        }
        PortalError::Hashing(source) => {
            error!(operation, error = %source, "password hashing failure");
        }
        other => debug!(operation, error = %other, "operation rejected"),
    }
}

/// Consult the access policy, turning a denial into [`PortalError::PermissionDenied`].
pub(crate) fn authorize(
    actor: &Actor,
    action: Action,
    target: Resource<'_>,
) -> Result<(), PortalError> {
    if can_perform(actor, action, target) {
        return Ok(());
    }
    warn!(
        actor = %actor.username,
        role = %actor.role,
        action = action.label(),
        "permission denied"
    );
    Err(PortalError::denied(action))
}

/// All portal services sharing one store.
pub struct PlacementPortal<R> {
    pub identity: IdentityService<R>,
    pub jobs: JobRegistry<R>,
    pub applications: ApplicationTracker<R>,
    pub reports: ReportingService<R>,
}

impl<R> PlacementPortal<R>
where
    R: PortalRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: &PortalConfig) -> Self {
        Self::with_parts(
            repository,
            PasswordHasher::new(config.password_memory_kib, config.password_iterations),
            config.review_policy,
            config.activity_limit,
        )
    }

    pub fn with_parts(
        repository: Arc<R>,
        hasher: PasswordHasher,
        review_policy: ReviewPolicy,
        activity_limit: usize,
    ) -> Self {
        Self {
            identity: IdentityService::new(repository.clone(), hasher),
            jobs: JobRegistry::new(repository.clone()),
            applications: ApplicationTracker::new(repository.clone(), review_policy),
            reports: ReportingService::new(repository, activity_limit),
        }
    }

    /// Resolve a username vouched for by the caller into an [`Actor`].
    pub fn actor(&self, username: &str) -> Result<Actor, PortalError> {
        self.identity
            .get_user(username)?
            .map(|user| Actor::from(&user))
            .ok_or_else(|| PortalError::UserNotFound(username.trim().to_string()))
    }
}
