use std::sync::Arc;

use super::views::{
    ActivityEntry, ActivityKind, ApplicationStatusCountEntry, JobStatusCountEntry, PortalCounts,
    PortalReportSummary, RoleCountEntry,
};
use crate::portal::domain::{Actor, ApplicationStatus, JobStatus, Role};
use crate::portal::policy::{Action, Resource};
use crate::portal::repository::{PortalRepository, StoreReader};
use crate::portal::service::{authorize, trace_failure, PortalError};

pub const DEFAULT_ACTIVITY_LIMIT: usize = 10;

/// Read-only aggregations over the whole portal. Admin only.
pub struct ReportingService<R> {
    pub(super) repository: Arc<R>,
    activity_limit: usize,
}

impl<R> ReportingService<R>
where
    R: PortalRepository + 'static,
{
    pub fn new(repository: Arc<R>, activity_limit: usize) -> Self {
        Self {
            repository,
            activity_limit: activity_limit.max(1),
        }
    }

    pub fn activity_limit(&self) -> usize {
        self.activity_limit
    }

    pub fn counts(&self, actor: &Actor) -> Result<PortalCounts, PortalError> {
        authorize(actor, Action::ViewReports, Resource::Portal)?;
        self.repository
            .read(|tx| Ok::<_, PortalError>(tally(tx)))
            .inspect_err(trace_failure("counts"))
    }

    /// Newest registrations, postings, and applications merged into one feed.
    /// `limit` defaults to the configured activity limit.
    pub fn recent_activity(
        &self,
        actor: &Actor,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityEntry>, PortalError> {
        authorize(actor, Action::ViewReports, Resource::Portal)?;
        let limit = limit.unwrap_or(self.activity_limit);
        self.repository
            .read(|tx| Ok::<_, PortalError>(activity_feed(tx, limit)))
            .inspect_err(trace_failure("recent_activity"))
    }

    /// Counts and activity read in the same transaction.
    pub fn summary(&self, actor: &Actor) -> Result<PortalReportSummary, PortalError> {
        authorize(actor, Action::ViewReports, Resource::Portal)?;
        let limit = self.activity_limit;
        self.repository
            .read(|tx| {
                Ok::<_, PortalError>(PortalReportSummary {
                    counts: tally(tx),
                    recent_activity: activity_feed(tx, limit),
                })
            })
            .inspect_err(trace_failure("summary"))
    }
}

fn tally(tx: &dyn StoreReader) -> PortalCounts {
    let users = tx.users();
    let jobs = tx.jobs();
    let applications = tx.applications();

    let users_by_role = Role::ordered()
        .into_iter()
        .map(|role| RoleCountEntry {
            role,
            role_label: role.label(),
            count: users.iter().filter(|user| user.role == role).count(),
        })
        .collect();

    let jobs_by_status = JobStatus::ordered()
        .into_iter()
        .map(|status| JobStatusCountEntry {
            status,
            status_label: status.label(),
            count: jobs.iter().filter(|job| job.status == status).count(),
        })
        .collect();

    let applications_by_status = ApplicationStatus::ordered()
        .into_iter()
        .map(|status| ApplicationStatusCountEntry {
            status,
            status_label: status.label(),
            count: applications
                .iter()
                .filter(|application| application.status == status)
                .count(),
        })
        .collect();

    PortalCounts {
        total_users: users.len(),
        total_jobs: jobs.len(),
        total_applications: applications.len(),
        users_by_role,
        jobs_by_status,
        applications_by_status,
    }
}

fn activity_feed(tx: &dyn StoreReader, limit: usize) -> Vec<ActivityEntry> {
    let jobs = tx.jobs();

    let registrations = tx.users().into_iter().map(|user| ActivityEntry {
        kind: ActivityKind::UserRegistered,
        kind_label: ActivityKind::UserRegistered.label(),
        at: user.created_at,
        summary: format!("{} registered as {}", user.username, user.role),
    });

    let postings = jobs.iter().map(|job| ActivityEntry {
        kind: ActivityKind::JobPosted,
        kind_label: ActivityKind::JobPosted.label(),
        at: job.posted_at,
        summary: format!("{} posted {}", job.company, job.title),
    });

    let submissions = tx.applications().into_iter().map(|application| {
        let target = jobs
            .iter()
            .find(|job| job.id == application.job_id)
            .map(|job| format!("{} at {}", job.title, job.company))
            .unwrap_or_else(|| format!("job {}", application.job_id));
        ActivityEntry {
            kind: ActivityKind::ApplicationSubmitted,
            kind_label: ActivityKind::ApplicationSubmitted.label(),
            at: application.applied_at,
            summary: format!("{} applied to {target}", application.student),
        }
    });

    let mut feed: Vec<ActivityEntry> = registrations.chain(postings).chain(submissions).collect();
    feed.sort_by(|a, b| b.at.cmp(&a.at));
    feed.truncate(limit);
    feed
}
