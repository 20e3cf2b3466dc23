use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    non_blank, Actor, JobDraft, JobFilter, JobId, JobPosting, JobStatus, Role,
};
use super::policy::{Action, Resource};
use super::repository::PortalRepository;
use super::service::{authorize, trace_failure, PortalError};

/// Job posting lifecycle: create, list, activate and deactivate.
pub struct JobRegistry<R> {
    repository: Arc<R>,
}

impl<R> JobRegistry<R>
where
    R: PortalRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Publish a posting under `company`. New postings start Active.
    pub fn post_job(
        &self,
        actor: &Actor,
        company: &str,
        draft: JobDraft,
    ) -> Result<JobPosting, PortalError> {
        let company = company.trim();
        let title = draft.title.trim();
        let description = draft.description.trim();
        let missing = [
            ("company", company),
            ("title", title),
            ("description", description),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty());
        if let Some((field, _)) = missing {
            return Err(PortalError::validation(field, "is required"));
        }

        authorize(actor, Action::PostJob, Resource::Company(company))?;

        let posting = JobPosting {
            id: JobId(0),
            company: company.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            location: non_blank(draft.location),
            job_type: non_blank(draft.job_type),
            duration: non_blank(draft.duration),
            stipend: non_blank(draft.stipend),
            requirements: non_blank(draft.requirements),
            deadline: draft.deadline,
            posted_at: Utc::now(),
            status: JobStatus::Active,
        };

        let stored = self
            .repository
            .transaction(|tx| -> Result<JobPosting, PortalError> {
                let owner_is_company = tx
                    .user(company)
                    .is_some_and(|owner| owner.role == Role::Company);
                if !owner_is_company {
                    return Err(PortalError::validation(
                        "company",
                        "must name a registered company",
                    ));
                }
                Ok(tx.insert_job(posting)?)
            })
            .inspect_err(trace_failure("post_job"))?;

        info!(job_id = %stored.id, company = %stored.company, actor = %actor.username, "job posted");
        Ok(stored)
    }

    /// Postings matching `filter`, newest first.
    pub fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, PortalError> {
        let mut jobs: Vec<JobPosting> = self
            .repository
            .read(|tx| Ok::<_, PortalError>(tx.jobs()))
            .inspect_err(trace_failure("list_jobs"))?
            .into_iter()
            .filter(|job| filter.matches(job))
            .collect();
        jobs.sort_by(|a, b| b.posted_at.cmp(&a.posted_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    pub fn get_job(&self, id: JobId) -> Result<Option<JobPosting>, PortalError> {
        self.repository
            .read(|tx| Ok::<_, PortalError>(tx.job(id)))
            .inspect_err(trace_failure("get_job"))
    }

    /// Activate or deactivate a posting. Setting the current status again is a no-op.
    pub fn set_job_status(
        &self,
        actor: &Actor,
        id: JobId,
        status: JobStatus,
    ) -> Result<JobPosting, PortalError> {
        let (job, changed) = self
            .repository
            .transaction(|tx| -> Result<(JobPosting, bool), PortalError> {
                let mut job = tx.job(id).ok_or(PortalError::JobNotFound(id))?;
                authorize(actor, Action::SetJobStatus, Resource::Job(&job))?;
                if job.status == status {
                    return Ok((job, false));
                }
                job.status = status;
                tx.update_job(job.clone())?;
                Ok((job, true))
            })
            .inspect_err(trace_failure("set_job_status"))?;

        if changed {
            info!(job_id = %id, status = job.status.label(), actor = %actor.username, "job status changed");
        }
        Ok(job)
    }
}
