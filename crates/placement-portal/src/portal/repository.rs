use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, JobId, JobPosting, User};

/// Unique constraint that rejected an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Username,
    Email,
    StudentJob,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated on {0:?}")]
    Conflict(UniqueKey),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Lookups shared by read-only access and transactions.
pub trait StoreReader {
    fn user(&self, username: &str) -> Option<User>;
    fn user_by_email(&self, email: &str) -> Option<User>;
    fn users(&self) -> Vec<User>;

    fn job(&self, id: JobId) -> Option<JobPosting>;
    fn jobs(&self) -> Vec<JobPosting>;

    fn application(&self, id: ApplicationId) -> Option<Application>;
    fn application_for(&self, student: &str, job_id: JobId) -> Option<Application>;
    fn applications(&self) -> Vec<Application>;
}

/// Writes available inside a single store transaction.
///
/// Inserts enforce the uniqueness constraints themselves, so a caller never
/// relies on a separate existence check before writing.
pub trait StoreTransaction: StoreReader {
    fn insert_user(&mut self, user: User) -> Result<User, RepositoryError>;
    fn update_user(&mut self, user: User) -> Result<(), RepositoryError>;

    /// Stores the posting under the next sequential id, ignoring `job.id`.
    fn insert_job(&mut self, job: JobPosting) -> Result<JobPosting, RepositoryError>;
    fn update_job(&mut self, job: JobPosting) -> Result<(), RepositoryError>;

    /// Stores the application under the next sequential id, ignoring `application.id`.
    fn insert_application(
        &mut self,
        application: Application,
    ) -> Result<Application, RepositoryError>;
    fn update_application(&mut self, application: Application) -> Result<(), RepositoryError>;
}

/// Storage abstraction so the portal services can be exercised in isolation.
pub trait PortalRepository: Send + Sync {
    /// Run `work` as one atomic unit: its writes commit only when it returns `Ok`.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>;

    /// Run `work` against a consistent view of the committed state. Nothing is written.
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreReader) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Complete persisted state of the portal: three keyed collections plus id sequences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalState {
    pub users: Vec<User>,
    pub jobs: Vec<JobPosting>,
    pub applications: Vec<Application>,
    pub next_job_id: u64,
    pub next_application_id: u64,
}

impl PortalState {
    fn allocate_job_id(&mut self) -> JobId {
        self.next_job_id = self.next_job_id.max(1);
        let id = JobId(self.next_job_id);
        self.next_job_id += 1;
        id
    }

    fn allocate_application_id(&mut self) -> ApplicationId {
        self.next_application_id = self.next_application_id.max(1);
        let id = ApplicationId(self.next_application_id);
        self.next_application_id += 1;
        id
    }
}

impl StoreReader for PortalState {
    fn user(&self, username: &str) -> Option<User> {
        self.users
            .iter()
            .find(|user| user.username == username)
            .cloned()
    }

    fn user_by_email(&self, email: &str) -> Option<User> {
        self.users.iter().find(|user| user.email == email).cloned()
    }

    fn users(&self) -> Vec<User> {
        self.users.clone()
    }

    fn job(&self, id: JobId) -> Option<JobPosting> {
        self.jobs.iter().find(|job| job.id == id).cloned()
    }

    fn jobs(&self) -> Vec<JobPosting> {
        self.jobs.clone()
    }

    fn application(&self, id: ApplicationId) -> Option<Application> {
        self.applications
            .iter()
            .find(|application| application.id == id)
            .cloned()
    }

    fn application_for(&self, student: &str, job_id: JobId) -> Option<Application> {
        self.applications
            .iter()
            .find(|application| application.student == student && application.job_id == job_id)
            .cloned()
    }

    fn applications(&self) -> Vec<Application> {
        self.applications.clone()
    }
}

impl StoreTransaction for PortalState {
    fn insert_user(&mut self, user: User) -> Result<User, RepositoryError> {
        if self.users.iter().any(|existing| existing.username == user.username) {
            return Err(RepositoryError::Conflict(UniqueKey::Username));
        }
        if self.users.iter().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict(UniqueKey::Email));
        }
        self.users.push(user.clone());
        Ok(user)
    }

    fn update_user(&mut self, user: User) -> Result<(), RepositoryError> {
        let slot = self
            .users
            .iter_mut()
            .find(|existing| existing.username == user.username)
            .ok_or(RepositoryError::NotFound)?;
        *slot = user;
        Ok(())
    }

    fn insert_job(&mut self, mut job: JobPosting) -> Result<JobPosting, RepositoryError> {
        job.id = self.allocate_job_id();
        self.jobs.push(job.clone());
        Ok(job)
    }

    fn update_job(&mut self, job: JobPosting) -> Result<(), RepositoryError> {
        let slot = self
            .jobs
            .iter_mut()
            .find(|existing| existing.id == job.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = job;
        Ok(())
    }

    fn insert_application(
        &mut self,
        mut application: Application,
    ) -> Result<Application, RepositoryError> {
        if self
            .application_for(&application.student, application.job_id)
            .is_some()
        {
            return Err(RepositoryError::Conflict(UniqueKey::StudentJob));
        }
        application.id = self.allocate_application_id();
        self.applications.push(application.clone());
        Ok(application)
    }

    fn update_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        let slot = self
            .applications
            .iter_mut()
            .find(|existing| existing.id == application.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = application;
        Ok(())
    }
}
