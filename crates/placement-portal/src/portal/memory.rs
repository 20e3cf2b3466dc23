use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::domain::{Application, ApplicationId, JobId, JobPosting, User};
use super::repository::{
    PortalRepository, PortalState, RepositoryError, StoreReader, StoreTransaction,
};

/// Mutex-guarded portal store, optionally mirrored to a JSON snapshot file.
///
/// Reads borrow the committed state under the lock. A transaction copies the
/// state on its first write; the copy replaces the live state only after the
/// closure succeeds and, when a snapshot path is configured, after the snapshot
/// has been written. Transactions that write nothing leave the file untouched.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPortalRepository {
    state: Arc<Mutex<PortalState>>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryPortalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`. A missing file starts an empty portal.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let state = load_snapshot(&path)?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Copy of the committed state.
    pub fn state(&self) -> Result<PortalState, RepositoryError> {
        let guard = self.state.lock().map_err(|_| poisoned())?;
        Ok(guard.clone())
    }
}

impl PortalRepository for InMemoryPortalRepository {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.state.lock().map_err(|_| poisoned())?;
        let mut staged = Staged::over(&guard);
        let outcome = work(&mut staged)?;

        if let Some(next) = staged.into_written() {
            if let Some(path) = &self.snapshot_path {
                write_snapshot(path, &next)?;
            }
            *guard = next;
        }
        Ok(outcome)
    }

    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn StoreReader) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let guard = self.state.lock().map_err(|_| poisoned())?;
        work(&*guard)
    }
}

/// Copy-on-write view of the committed state for one transaction.
struct Staged<'a> {
    committed: &'a PortalState,
    copy: Option<PortalState>,
    written: bool,
}

impl<'a> Staged<'a> {
    fn over(committed: &'a PortalState) -> Self {
        Self {
            committed,
            copy: None,
            written: false,
        }
    }

    fn view(&self) -> &PortalState {
        self.copy.as_ref().unwrap_or(self.committed)
    }

    fn copy_mut(&mut self) -> &mut PortalState {
        let committed = self.committed;
        self.copy.get_or_insert_with(|| committed.clone())
    }

    fn record<T>(&mut self, result: Result<T, RepositoryError>) -> Result<T, RepositoryError> {
        if result.is_ok() {
            self.written = true;
        }
        result
    }

    /// The new state, if any write succeeded.
    fn into_written(self) -> Option<PortalState> {
        if self.written {
            self.copy
        } else {
            None
        }
    }
}

impl StoreReader for Staged<'_> {
    fn user(&self, username: &str) -> Option<User> {
        self.view().user(username)
    }

    fn user_by_email(&self, email: &str) -> Option<User> {
        self.view().user_by_email(email)
    }

    fn users(&self) -> Vec<User> {
        self.view().users()
    }

    fn job(&self, id: JobId) -> Option<JobPosting> {
        self.view().job(id)
    }

    fn jobs(&self) -> Vec<JobPosting> {
        self.view().jobs()
    }

    fn application(&self, id: ApplicationId) -> Option<Application> {
        self.view().application(id)
    }

    fn application_for(&self, student: &str, job_id: JobId) -> Option<Application> {
        self.view().application_for(student, job_id)
    }

    fn applications(&self) -> Vec<Application> {
        self.view().applications()
    }
}

impl StoreTransaction for Staged<'_> {
    fn insert_user(&mut self, user: User) -> Result<User, RepositoryError> {
        let result = self.copy_mut().insert_user(user);
        self.record(result)
    }

    fn update_user(&mut self, user: User) -> Result<(), RepositoryError> {
        let result = self.copy_mut().update_user(user);
        self.record(result)
    }

    fn insert_job(&mut self, job: JobPosting) -> Result<JobPosting, RepositoryError> {
        let result = self.copy_mut().insert_job(job);
        self.record(result)
    }

    fn update_job(&mut self, job: JobPosting) -> Result<(), RepositoryError> {
        let result = self.copy_mut().update_job(job);
        self.record(result)
    }

    fn insert_application(
        &mut self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let result = self.copy_mut().insert_application(application);
        self.record(result)
    }

    fn update_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        let result = self.copy_mut().update_application(application);
        self.record(result)
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("portal store lock poisoned".to_string())
}

fn load_snapshot(path: &Path) -> Result<PortalState, RepositoryError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
            RepositoryError::Unavailable(format!(
                "snapshot {} is not valid portal data: {err}",
                path.display()
            ))
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot found, starting empty portal");
            Ok(PortalState::default())
        }
        Err(err) => Err(RepositoryError::Unavailable(format!(
            "unable to read snapshot {}: {err}",
            path.display()
        ))),
    }
}

fn write_snapshot(path: &Path, state: &PortalState) -> Result<(), RepositoryError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| write_error(path, err))?;
    }

    let bytes = serde_json::to_vec_pretty(state).map_err(|err| write_error(path, err))?;
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);

    fs::write(&staging, bytes).map_err(|err| write_error(path, err))?;
    fs::rename(&staging, path).map_err(|err| write_error(path, err))
}

fn write_error(path: &Path, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!(
        "unable to write snapshot {}: {err}",
        path.display()
    ))
}
