use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::credentials::PasswordHasher;
use super::domain::{non_blank, Actor, Registration, Role, User, UserView};
use super::policy::{Action, Resource};
use super::repository::{PortalRepository, RepositoryError, UniqueKey};
use super::service::{authorize, trace_failure, PortalError};

pub const MIN_PASSWORD_LEN: usize = 8;

/// User registration, credential verification, and user lookups.
pub struct IdentityService<R> {
    repository: Arc<R>,
    hasher: PasswordHasher,
}

impl<R> IdentityService<R>
where
    R: PortalRepository + 'static,
{
    pub fn new(repository: Arc<R>, hasher: PasswordHasher) -> Self {
        Self { repository, hasher }
    }

    /// Validate and store a new user. The password is hashed before the store is touched.
    pub fn register(&self, registration: Registration) -> Result<UserView, PortalError> {
        let validated = ValidRegistration::try_from(registration)
            .inspect_err(trace_failure("register"))?;

        let password_hash = self
            .hasher
            .hash(&validated.password)
            .map_err(PortalError::Hashing)
            .inspect_err(trace_failure("register"))?;

        let user = User {
            password_hash,
            username: validated.username,
            role: validated.role,
            email: validated.email,
            full_name: validated.full_name,
            organization: validated.organization,
            created_at: Utc::now(),
            last_login: None,
        };

        let stored = self
            .repository
            .transaction(|tx| {
                tx.insert_user(user).map_err(|err| match err {
                    RepositoryError::Conflict(UniqueKey::Email) => PortalError::DuplicateEmail,
                    RepositoryError::Conflict(_) => PortalError::DuplicateUsername,
                    other => PortalError::from(other),
                })
            })
            .inspect_err(trace_failure("register"))?;

        info!(username = %stored.username, role = %stored.role, "user registered");
        Ok(stored.view())
    }

    /// Verify credentials and stamp `last_login`.
    ///
    /// Unknown users and wrong passwords fail identically, and an unknown user
    /// still pays the hashing cost.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserView, PortalError> {
        let username = username.trim();
        let stored = self
            .repository
            .read(|tx| Ok::<_, PortalError>(tx.user(username)))
            .inspect_err(trace_failure("authenticate"))?;

        let verified = match stored {
            Some(user) => self.hasher.verify(password, &user.password_hash),
            None => {
                self.hasher.burn(password);
                false
            }
        };
        if !verified {
            warn!(username, "authentication failed");
            return Err(PortalError::InvalidCredentials);
        }

        let now = Utc::now();
        let user = self
            .repository
            .transaction(|tx| -> Result<User, PortalError> {
                let mut user = tx.user(username).ok_or(PortalError::InvalidCredentials)?;
                let login = user.last_login.map_or(now, |previous| previous.max(now));
                user.last_login = Some(login);
                tx.update_user(user.clone())?;
                Ok(user)
            })
            .inspect_err(trace_failure("authenticate"))?;

        info!(username, role = %user.role, "user authenticated");
        Ok(user.view())
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserView>, PortalError> {
        let username = username.trim();
        self.repository
            .read(|tx| Ok::<_, PortalError>(tx.user(username).map(|user| user.view())))
            .inspect_err(trace_failure("get_user"))
    }

    /// Every user, newest first. Admin only.
    pub fn list_users(&self, actor: &Actor) -> Result<Vec<UserView>, PortalError> {
        authorize(actor, Action::ViewUsers, Resource::Portal)?;

        let mut users = self
            .repository
            .read(|tx| Ok::<_, PortalError>(tx.users()))
            .inspect_err(trace_failure("list_users"))?;
        users.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users.iter().map(User::view).collect())
    }
}

struct ValidRegistration {
    username: String,
    password: String,
    role: Role,
    email: String,
    full_name: Option<String>,
    organization: Option<String>,
}

impl TryFrom<Registration> for ValidRegistration {
    type Error = PortalError;

    fn try_from(registration: Registration) -> Result<Self, Self::Error> {
        let username = registration.username.trim().to_string();
        if username.is_empty() {
            return Err(PortalError::validation("username", "is required"));
        }

        if registration.password.is_empty() {
            return Err(PortalError::validation("password", "is required"));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortalError::validation(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        let role = registration
            .role
            .ok_or_else(|| PortalError::validation("role", "is required"))?;

        let email = registration.email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(PortalError::validation("email", "is required"));
        }
        if !is_valid_email(&email) {
            return Err(PortalError::validation("email", "is not a valid address"));
        }

        Ok(Self {
            username,
            password: registration.password,
            role,
            email,
            full_name: non_blank(registration.full_name),
            organization: non_blank(registration.organization),
        })
    }
}

/// `local@domain.tld` with the usual address characters and an alphabetic TLD.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));

    let labels: Vec<&str> = domain.split('.').collect();
    let labels_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    local_ok && labels_ok && tld_ok
}
