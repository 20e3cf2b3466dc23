use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    non_blank, Actor, Application, ApplicationDraft, ApplicationId, ApplicationStatus,
    ApplicationView, JobId, JobStatus, ReviewDecision, Role, UnknownKeyword,
};
use super::policy::{Action, Resource};
use super::repository::{PortalRepository, RepositoryError, StoreReader};
use super::service::{authorize, trace_failure, PortalError};

/// Whether a reviewed application may be reviewed again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPolicy {
    /// Any status may follow any other; a new review overwrites the previous one.
    #[default]
    Revisable,
    /// Approved and Rejected are final.
    TerminalOnce,
}

impl ReviewPolicy {
    pub fn permits(self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        match self {
            Self::Revisable => true,
            Self::TerminalOnce => !from.is_terminal() || from == to,
        }
    }
}

impl FromStr for ReviewPolicy {
    type Err = UnknownKeyword;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "revisable" => Ok(Self::Revisable),
            "terminal_once" | "terminal-once" => Ok(Self::TerminalOnce),
            _ => Err(UnknownKeyword {
                kind: "review policy",
                value: value.to_string(),
            }),
        }
    }
}

/// Student applications: intake, listings, and the review workflow.
pub struct ApplicationTracker<R> {
    repository: Arc<R>,
    review_policy: ReviewPolicy,
}

impl<R> ApplicationTracker<R>
where
    R: PortalRepository + 'static,
{
    pub fn new(repository: Arc<R>, review_policy: ReviewPolicy) -> Self {
        Self {
            repository,
            review_policy,
        }
    }

    pub fn review_policy(&self) -> ReviewPolicy {
        self.review_policy
    }

    /// File an application for `student`.
    ///
    /// Checked in order: no earlier application for the same job, the job
    /// exists, the job is Active. The duplicate check is repeated by the store
    /// insert, so concurrent submissions cannot both succeed.
    pub fn apply(
        &self,
        actor: &Actor,
        student: &str,
        job_id: JobId,
        draft: ApplicationDraft,
    ) -> Result<Application, PortalError> {
        let student = student.trim();
        if student.is_empty() {
            return Err(PortalError::validation("student", "is required"));
        }
        authorize(actor, Action::Apply, Resource::Student(student))?;

        let application = Application {
            id: ApplicationId(0),
            student: student.to_string(),
            job_id,
            resume_path: non_blank(draft.resume_path),
            cover_letter: non_blank(draft.cover_letter),
            skills: non_blank(draft.skills),
            applied_at: Utc::now(),
            status: ApplicationStatus::Pending,
            feedback: None,
            reviewed_at: None,
            reviewed_by: None,
        };

        let stored = self
            .repository
            .transaction(|tx| -> Result<Application, PortalError> {
                if tx.application_for(student, job_id).is_some() {
                    return Err(PortalError::AlreadyApplied(job_id));
                }
                let job = tx.job(job_id).ok_or(PortalError::JobNotFound(job_id))?;
                if job.status != JobStatus::Active {
                    return Err(PortalError::JobClosed(job_id));
                }
                let is_student = tx
                    .user(student)
                    .is_some_and(|user| user.role == Role::Student);
                if !is_student {
                    return Err(PortalError::validation(
                        "student",
                        "must name a registered student",
                    ));
                }

                tx.insert_application(application).map_err(|err| match err {
                    RepositoryError::Conflict(_) => PortalError::AlreadyApplied(job_id),
                    other => PortalError::from(other),
                })
            })
            .inspect_err(trace_failure("apply"))?;

        info!(application_id = %stored.id, job_id = %job_id, student, "application submitted");
        Ok(stored)
    }

    /// A student's applications, newest first.
    pub fn list_for_student(
        &self,
        actor: &Actor,
        student: &str,
    ) -> Result<Vec<ApplicationView>, PortalError> {
        let student = student.trim();
        authorize(actor, Action::ViewApplications, Resource::Student(student))?;
        self.joined("list_for_student", |application, _| {
            application.student == student
        })
    }

    /// Applications to any posting owned by `company`, newest first.
    pub fn list_for_company(
        &self,
        actor: &Actor,
        company: &str,
    ) -> Result<Vec<ApplicationView>, PortalError> {
        let company = company.trim();
        authorize(actor, Action::ViewApplications, Resource::Company(company))?;
        self.joined("list_for_company", |_, job_company| job_company == company)
    }

    /// Every application in the portal, newest first. Admin only.
    pub fn list_all(&self, actor: &Actor) -> Result<Vec<ApplicationView>, PortalError> {
        authorize(actor, Action::ViewApplications, Resource::Portal)?;
        self.joined("list_all", |_, _| true)
    }

    pub fn get_application(
        &self,
        actor: &Actor,
        id: ApplicationId,
    ) -> Result<ApplicationView, PortalError> {
        self.repository
            .read(|tx| -> Result<ApplicationView, PortalError> {
                let application = tx.application(id).ok_or(PortalError::ApplicationNotFound(id))?;
                let job = tx
                    .job(application.job_id)
                    .ok_or(PortalError::JobNotFound(application.job_id))?;
                authorize(
                    actor,
                    Action::ViewApplications,
                    Resource::Application {
                        application: &application,
                        job: &job,
                    },
                )?;
                let student = tx.user(&application.student);
                Ok(ApplicationView::join(&application, &job, student.as_ref()))
            })
            .inspect_err(trace_failure("get_application"))
    }

    /// Record a review decision: status, feedback, reviewer, and review time.
    pub fn review(
        &self,
        actor: &Actor,
        id: ApplicationId,
        decision: ReviewDecision,
    ) -> Result<ApplicationView, PortalError> {
        let review_policy = self.review_policy;
        let view = self
            .repository
            .transaction(|tx| -> Result<ApplicationView, PortalError> {
                let mut application =
                    tx.application(id).ok_or(PortalError::ApplicationNotFound(id))?;
                let job = tx
                    .job(application.job_id)
                    .ok_or(PortalError::JobNotFound(application.job_id))?;
                authorize(
                    actor,
                    Action::ReviewApplication,
                    Resource::Application {
                        application: &application,
                        job: &job,
                    },
                )?;

                if !review_policy.permits(application.status, decision.status) {
                    return Err(PortalError::InvalidTransition {
                        from: application.status,
                        to: decision.status,
                    });
                }

                application.status = decision.status;
                application.feedback = non_blank(decision.feedback);
                application.reviewed_at = Some(Utc::now());
                application.reviewed_by = Some(actor.username.clone());
                tx.update_application(application.clone())?;

                let student = tx.user(&application.student);
                Ok(ApplicationView::join(&application, &job, student.as_ref()))
            })
            .inspect_err(trace_failure("review"))?;

        info!(
            application_id = %id,
            status = view.status_label,
            reviewer = %actor.username,
            "application reviewed"
        );
        Ok(view)
    }

    fn joined<F>(
        &self,
        operation: &'static str,
        include: F,
    ) -> Result<Vec<ApplicationView>, PortalError>
    where
        F: Fn(&Application, &str) -> bool,
    {
        let mut views = self
            .repository
            .read(|tx| Ok::<_, PortalError>(join_applications(tx, include)))
            .inspect_err(trace_failure(operation))?;
        views.sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then(b.id.cmp(&a.id)));
        Ok(views)
    }
}

/// Join every application accepted by `include` (given the owning company)
/// with its posting and student.
pub(crate) fn join_applications<F>(tx: &dyn StoreReader, include: F) -> Vec<ApplicationView>
where
    F: Fn(&Application, &str) -> bool,
{
    tx.applications()
        .iter()
        .filter_map(|application| {
            let job = tx.job(application.job_id)?;
            if !include(application, &job.company) {
                return None;
            }
            let student = tx.user(&application.student);
            Some(ApplicationView::join(application, &job, student.as_ref()))
        })
        .collect()
}
