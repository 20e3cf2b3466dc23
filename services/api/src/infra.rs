use metrics_exporter_prometheus::PrometheusHandle;
use placement_portal::config::PortalConfig;
use placement_portal::error::AppError;
use placement_portal::portal::{ExportEntity, InMemoryPortalRepository, PlacementPortal};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Portal = PlacementPortal<InMemoryPortalRepository>;

/// Open the portal over the configured store: the snapshot file when
/// `PORTAL_DATA_PATH` is set, a process-local store otherwise.
pub(crate) fn open_portal(config: &PortalConfig) -> Result<Arc<Portal>, AppError> {
    let repository = match &config.data_path {
        Some(path) => {
            info!(path = %path.display(), "opening portal snapshot");
            InMemoryPortalRepository::with_snapshot(path)?
        }
        None => InMemoryPortalRepository::new(),
    };
    Ok(Arc::new(PlacementPortal::new(Arc::new(repository), config)))
}

pub(crate) fn parse_export_entity(raw: &str) -> Result<ExportEntity, String> {
    raw.parse::<ExportEntity>()
        .map_err(|_| format!("expected users, jobs, or applications, got '{raw}'"))
}
