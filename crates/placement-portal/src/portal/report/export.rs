use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::summary::ReportingService;
use crate::portal::applications::join_applications;
use crate::portal::domain::{Actor, UnknownKeyword};
use crate::portal::policy::{Action, Resource};
use crate::portal::repository::PortalRepository;
use crate::portal::service::{authorize, trace_failure, PortalError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportEntity {
    Users,
    Jobs,
    Applications,
}

impl ExportEntity {
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Users => "users.csv",
            Self::Jobs => "jobs.csv",
            Self::Applications => "applications.csv",
        }
    }
}

impl FromStr for ExportEntity {
    type Err = UnknownKeyword;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "users" => Ok(Self::Users),
            "jobs" => Ok(Self::Jobs),
            "applications" => Ok(Self::Applications),
            _ => Err(UnknownKeyword {
                kind: "export",
                value: value.to_string(),
            }),
        }
    }
}

/// A row type with a fixed spreadsheet header, in field order.
pub trait ExportRow: Serialize {
    const HEADERS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserExportRow {
    pub username: String,
    pub role: &'static str,
    pub email: String,
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl ExportRow for UserExportRow {
    const HEADERS: &'static [&'static str] = &[
        "Username",
        "Role",
        "Email",
        "Full Name",
        "Organization",
        "Created At",
        "Last Login",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobExportRow {
    pub id: u64,
    pub company: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub duration: Option<String>,
    pub stipend: Option<String>,
    pub requirements: Option<String>,
    pub deadline: Option<String>,
    pub posted_at: String,
    pub status: &'static str,
    pub applications: usize,
}

impl ExportRow for JobExportRow {
    const HEADERS: &'static [&'static str] = &[
        "Job ID",
        "Company",
        "Title",
        "Description",
        "Location",
        "Job Type",
        "Duration",
        "Stipend",
        "Requirements",
        "Deadline",
        "Posted At",
        "Status",
        "Applications",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationExportRow {
    pub id: u64,
    pub student: String,
    pub student_full_name: Option<String>,
    pub student_email: Option<String>,
    pub job_id: u64,
    pub job_title: String,
    pub company: String,
    pub skills: Option<String>,
    pub resume_path: Option<String>,
    pub cover_letter: Option<String>,
    pub applied_at: String,
    pub status: &'static str,
    pub feedback: Option<String>,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
}

impl ExportRow for ApplicationExportRow {
    const HEADERS: &'static [&'static str] = &[
        "Application ID",
        "Student",
        "Student Name",
        "Student Email",
        "Job ID",
        "Job Title",
        "Company",
        "Skills",
        "Resume",
        "Cover Letter",
        "Applied At",
        "Status",
        "Feedback",
        "Reviewed At",
        "Reviewed By",
    ];
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error("failed to write export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

impl<R> ReportingService<R>
where
    R: PortalRepository + 'static,
{
    /// Users ordered by registration time; password hashes are never exported.
    pub fn user_rows(&self, actor: &Actor) -> Result<Vec<UserExportRow>, PortalError> {
        authorize(actor, Action::ViewReports, Resource::Portal)?;
        let mut users = self
            .repository
            .read(|tx| Ok::<_, PortalError>(tx.users()))
            .inspect_err(trace_failure("user_rows"))?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(users
            .into_iter()
            .map(|user| UserExportRow {
                role: user.role.label(),
                created_at: timestamp(user.created_at),
                last_login: user.last_login.map(timestamp),
                username: user.username,
                email: user.email,
                full_name: user.full_name,
                organization: user.organization,
            })
            .collect())
    }

    /// Postings by id, with the number of applications each received.
    pub fn job_rows(&self, actor: &Actor) -> Result<Vec<JobExportRow>, PortalError> {
        authorize(actor, Action::ViewReports, Resource::Portal)?;
        let (mut jobs, applications) = self
            .repository
            .read(|tx| Ok::<_, PortalError>((tx.jobs(), tx.applications())))
            .inspect_err(trace_failure("job_rows"))?;
        jobs.sort_by_key(|job| job.id);

        Ok(jobs
            .into_iter()
            .map(|job| JobExportRow {
                id: job.id.0,
                applications: applications
                    .iter()
                    .filter(|application| application.job_id == job.id)
                    .count(),
                deadline: job.deadline.map(|date| date.format("%Y-%m-%d").to_string()),
                posted_at: timestamp(job.posted_at),
                status: job.status.label(),
                company: job.company,
                title: job.title,
                description: job.description,
                location: job.location,
                job_type: job.job_type,
                duration: job.duration,
                stipend: job.stipend,
                requirements: job.requirements,
            })
            .collect())
    }

    /// Applications by id, joined with posting and student display fields.
    pub fn application_rows(
        &self,
        actor: &Actor,
    ) -> Result<Vec<ApplicationExportRow>, PortalError> {
        authorize(actor, Action::ViewReports, Resource::Portal)?;
        let mut views = self
            .repository
            .read(|tx| Ok::<_, PortalError>(join_applications(tx, |_, _| true)))
            .inspect_err(trace_failure("application_rows"))?;
        views.sort_by_key(|view| view.id);

        Ok(views
            .into_iter()
            .map(|view| ApplicationExportRow {
                id: view.id.0,
                job_id: view.job_id.0,
                applied_at: timestamp(view.applied_at),
                status: view.status_label,
                reviewed_at: view.reviewed_at.map(timestamp),
                student: view.student,
                student_full_name: view.student_full_name,
                student_email: view.student_email,
                job_title: view.job_title,
                company: view.company,
                skills: view.skills,
                resume_path: view.resume_path,
                cover_letter: view.cover_letter,
                feedback: view.feedback,
                reviewed_by: view.reviewed_by,
            })
            .collect())
    }

    /// Write one entity's rows as CSV with a header line, returning the row count.
    pub fn export_csv<W: Write>(
        &self,
        actor: &Actor,
        entity: ExportEntity,
        writer: W,
    ) -> Result<usize, ExportError> {
        match entity {
            ExportEntity::Users => write_rows(writer, &self.user_rows(actor)?),
            ExportEntity::Jobs => write_rows(writer, &self.job_rows(actor)?),
            ExportEntity::Applications => write_rows(writer, &self.application_rows(actor)?),
        }
    }
}

fn write_rows<W: Write, T: ExportRow>(writer: W, rows: &[T]) -> Result<usize, ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(T::HEADERS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(rows.len())
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}
