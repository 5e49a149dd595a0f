//! Centralized metrics for the ingestion pipeline
//!
//! Each pipeline phase defines its own metrics in a dedicated submodule, so
//! names stay unique and every call site reads `PhaseMetrics::record_*`.
//! Without an installed recorder every call is a no-op, which is what the
//! library and its tests rely on.

pub mod ingestion;
pub mod persistence;
pub mod validation;

pub use ingestion::IngestionMetrics;
pub use persistence::PersistenceMetrics;
pub use validation::ValidationMetrics;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the in-process Prometheus recorder and describe every phase metric.
///
/// Idempotent. No HTTP listener is started: the process is a short-lived job,
/// so the snapshot is rendered on demand with [`render`].
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("METRICS: handle already stored");
            }
            register_phase::<IngestionMetrics>();
            register_phase::<ValidationMetrics>();
            register_phase::<PersistenceMetrics>();
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Prometheus text snapshot of everything recorded so far, if a recorder is installed
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Phase-specific metric collections describe their metrics once at startup
pub trait PhaseMetrics {
    fn register_metrics();

    fn phase_name() -> &'static str;
}

fn register_phase<T: PhaseMetrics>() {
    T::register_metrics();
    info!("Registered metrics for phase '{}'", T::phase_name());
}

/// Builds metric names following `mi_{phase}_{metric_name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("mi_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("mi_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("mi_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
