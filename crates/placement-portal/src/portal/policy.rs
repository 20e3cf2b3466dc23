//! Role and ownership rules deciding which actor may perform which action.
//!
//! Every restricted service call asks [`can_perform`] before touching the
//! store, so role branching lives here and nowhere else.

use serde::Serialize;

use super::domain::{Actor, Application, JobPosting, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PostJob,
    SetJobStatus,
    Apply,
    ViewApplications,
    ReviewApplication,
    ViewUsers,
    ViewReports,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PostJob => "post job",
            Self::SetJobStatus => "change job status",
            Self::Apply => "apply",
            Self::ViewApplications => "view applications",
            Self::ReviewApplication => "review application",
            Self::ViewUsers => "view users",
            Self::ViewReports => "view reports",
        }
    }
}

/// Record an action is aimed at.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// Portal-wide data: every user, every application, the reports.
    Portal,
    /// Postings and applications filed under a company name.
    Company(&'a str),
    /// Applications belonging to a student.
    Student(&'a str),
    Job(&'a JobPosting),
    Application {
        application: &'a Application,
        job: &'a JobPosting,
    },
}

pub fn can_perform(actor: &Actor, action: Action, target: Resource<'_>) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Company => company_may(actor, action, target),
        Role::Student => student_may(actor, action, target),
    }
}

fn company_may(actor: &Actor, action: Action, target: Resource<'_>) -> bool {
    match (action, target) {
        (Action::PostJob | Action::ViewApplications, Resource::Company(company)) => {
            actor.is(company)
        }
        (Action::SetJobStatus, Resource::Job(job)) => actor.is(&job.company),
        (Action::ReviewApplication | Action::ViewApplications, Resource::Application { job, .. }) => {
            actor.is(&job.company)
        }
        _ => false,
    }
}

fn student_may(actor: &Actor, action: Action, target: Resource<'_>) -> bool {
    match (action, target) {
        (Action::Apply | Action::ViewApplications, Resource::Student(student)) => {
            actor.is(student)
        }
        (Action::ViewApplications, Resource::Application { application, .. }) => {
            actor.is(&application.student)
        }
        _ => false,
    }
}
