mod export;
mod summary;
pub mod views;

pub use export::{
    ApplicationExportRow, ExportEntity, ExportError, ExportRow, JobExportRow, UserExportRow,
};
pub use summary::{ReportingService, DEFAULT_ACTIVITY_LIMIT};
