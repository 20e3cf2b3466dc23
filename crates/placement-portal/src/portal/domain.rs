use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Portal role assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Student,
    Company,
    Admin,
}

impl Role {
    pub const fn ordered() -> [Self; 3] {
        [Self::Student, Self::Company, Self::Admin]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Company => "Company",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a role, status, or filter keyword is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} '{value}'")]
pub struct UnknownKeyword {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Role {
    type Err = UnknownKeyword;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "company" => Ok(Self::Company),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownKeyword {
                kind: "role",
                value: value.to_string(),
            }),
        }
    }
}

/// Stored user record, including the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub email: String,
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn view(&self) -> UserView {
        UserView {
            username: self.username.clone(),
            role: self.role,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            organization: self.organization.clone(),
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// User record as exposed to callers; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub username: String,
    pub role: Role,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// The authenticated user performing an operation.
///
/// Built by the presentation layer after authentication and passed into every
/// restricted call; nothing in the domain layer reads a global session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn is(&self, username: &str) -> bool {
        self.username == username
    }
}

impl From<&UserView> for Actor {
    fn from(user: &UserView) -> Self {
        Self::new(user.username.clone(), user.role)
    }
}

/// Registration form submitted by a prospective user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Option<Role>,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

/// Sequential identifier of a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Active,
    Inactive,
}

impl JobStatus {
    pub const fn ordered() -> [Self; 2] {
        [Self::Active, Self::Inactive]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }
}

impl FromStr for JobStatus {
    type Err = UnknownKeyword;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(UnknownKeyword {
                kind: "job status",
                value: value.to_string(),
            }),
        }
    }
}

/// Status selector for job listings. `All` is the explicit sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    ActiveOnly,
    Only(JobStatus),
    All,
}

impl StatusFilter {
    pub fn matches(self, status: JobStatus) -> bool {
        match self {
            Self::ActiveOnly => status == JobStatus::Active,
            Self::Only(expected) => status == expected,
            Self::All => true,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownKeyword;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        value.parse::<JobStatus>().map(Self::Only).map_err(|_| UnknownKeyword {
            kind: "status filter",
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    pub company: Option<String>,
    pub status: StatusFilter,
}

impl JobFilter {
    pub fn matches(&self, job: &JobPosting) -> bool {
        let company_matches = self
            .company
            .as_deref()
            .map_or(true, |company| job.company == company);
        company_matches && self.status.matches(job.status)
    }
}

/// Posting form; the optional fields are the free-text extras shown on a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub stipend: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub company: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub duration: Option<String>,
    pub stipend: Option<String>,
    pub requirements: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub posted_at: DateTime<Utc>,
    pub status: JobStatus,
}

/// Sequential identifier of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Approved, Self::Rejected]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownKeyword;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownKeyword {
                kind: "application status",
                value: value.to_string(),
            }),
        }
    }
}

/// Optional material a student attaches when applying.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    #[serde(default)]
    pub resume_path: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub student: String,
    pub job_id: JobId,
    pub resume_path: Option<String>,
    pub cover_letter: Option<String>,
    pub skills: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub feedback: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
}

/// Outcome recorded by a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Application joined with the posting and student display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub job_title: String,
    pub company: String,
    pub student: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
}

impl ApplicationView {
    pub fn join(application: &Application, job: &JobPosting, student: Option<&User>) -> Self {
        Self {
            id: application.id,
            job_id: application.job_id,
            job_title: job.title.clone(),
            company: job.company.clone(),
            student: application.student.clone(),
            student_full_name: student.and_then(|user| user.full_name.clone()),
            student_email: student.map(|user| user.email.clone()),
            student_organization: student.and_then(|user| user.organization.clone()),
            resume_path: application.resume_path.clone(),
            cover_letter: application.cover_letter.clone(),
            skills: application.skills.clone(),
            applied_at: application.applied_at,
            status: application.status,
            status_label: application.status.label(),
            feedback: application.feedback.clone(),
            reviewed_at: application.reviewed_at,
            reviewed_by: application.reviewed_by.clone(),
        }
    }
}

/// Trim a free-text field, mapping blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
