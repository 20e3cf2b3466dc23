use crate::infra::{open_portal, parse_export_entity};
use clap::Args;
use placement_portal::config::AppConfig;
use placement_portal::error::AppError;
use placement_portal::portal::report::views::{ActivityEntry, PortalCounts, PortalReportSummary};
use placement_portal::portal::ExportEntity;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Administrator the report is run as
    #[arg(long = "as", value_name = "USERNAME", default_value = "admin")]
    pub(crate) actor: String,
    /// Number of activity entries to show (defaults to PORTAL_ACTIVITY_LIMIT)
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// users, jobs, or applications
    #[arg(value_parser = parse_export_entity)]
    pub(crate) entity: ExportEntity,
    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
    /// Administrator the export is run as
    #[arg(long = "as", value_name = "USERNAME", default_value = "admin")]
    pub(crate) actor: String,
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    warn_if_ephemeral(&config);
    let portal = open_portal(&config.portal)?;

    let actor = portal.actor(&args.actor)?;
    let summary = PortalReportSummary {
        counts: portal.reports.counts(&actor)?,
        recent_activity: portal.reports.recent_activity(&actor, args.limit)?,
    };

    if args.json {
        serde_json::to_writer_pretty(io::stdout().lock(), &summary).map_err(io::Error::from)?;
        println!();
    } else {
        render_summary(&summary.counts, &summary.recent_activity);
    }
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    warn_if_ephemeral(&config);
    let portal = open_portal(&config.portal)?;
    let actor = portal.actor(&args.actor)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)?;
            let rows = portal
                .reports
                .export_csv(&actor, args.entity, BufWriter::new(file))?;
            eprintln!("Wrote {rows} row(s) to {}", path.display());
        }
        None => {
            portal
                .reports
                .export_csv(&actor, args.entity, io::stdout().lock())?;
        }
    }
    Ok(())
}

fn warn_if_ephemeral(config: &AppConfig) {
    if config.portal.data_path.is_none() {
        eprintln!("PORTAL_DATA_PATH is not set; reading an empty in-memory portal");
    }
}

pub(crate) fn render_summary(counts: &PortalCounts, activity: &[ActivityEntry]) {
    println!("Portal overview");
    let roles = counts
        .users_by_role
        .iter()
        .map(|entry| format!("{} {}", entry.role_label, entry.count))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  Users: {} ({roles})", counts.total_users);

    let jobs = counts
        .jobs_by_status
        .iter()
        .map(|entry| format!("{} {}", entry.status_label, entry.count))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  Jobs: {} ({jobs})", counts.total_jobs);

    let applications = counts
        .applications_by_status
        .iter()
        .map(|entry| format!("{} {}", entry.status_label, entry.count))
        .collect::<Vec<_>>()
        .join(", ");
    println!(
        "  Applications: {} ({applications})",
        counts.total_applications
    );

    println!("\nRecent activity");
    if activity.is_empty() {
        println!("  (none)");
    }
    for entry in activity {
        println!(
            "  {} [{}] {}",
            entry.at.format("%Y-%m-%d %H:%M"),
            entry.kind_label,
            entry.summary
        );
    }
}
