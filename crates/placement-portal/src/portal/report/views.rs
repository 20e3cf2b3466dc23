use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::portal::domain::{ApplicationStatus, JobStatus, Role};

#[derive(Debug, Clone, Serialize)]
pub struct RoleCountEntry {
    pub role: Role,
    pub role_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatusCountEntry {
    pub status: JobStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStatusCountEntry {
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Dashboard tallies. Every role and status is listed, with zero counts included.
#[derive(Debug, Clone, Serialize)]
pub struct PortalCounts {
    pub total_users: usize,
    pub total_jobs: usize,
    pub total_applications: usize,
    pub users_by_role: Vec<RoleCountEntry>,
    pub jobs_by_status: Vec<JobStatusCountEntry>,
    pub applications_by_status: Vec<ApplicationStatusCountEntry>,
}

impl PortalCounts {
    pub fn users_with_role(&self, role: Role) -> usize {
        self.users_by_role
            .iter()
            .find(|entry| entry.role == role)
            .map_or(0, |entry| entry.count)
    }

    pub fn jobs_with_status(&self, status: JobStatus) -> usize {
        self.jobs_by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }

    pub fn applications_with_status(&self, status: ApplicationStatus) -> usize {
        self.applications_by_status
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    UserRegistered,
    JobPosted,
    ApplicationSubmitted,
}

impl ActivityKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UserRegistered => "New User",
            Self::JobPosted => "New Job",
            Self::ApplicationSubmitted => "New Application",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub kind_label: &'static str,
    pub at: DateTime<Utc>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalReportSummary {
    pub counts: PortalCounts,
    pub recent_activity: Vec<ActivityEntry>,
}
