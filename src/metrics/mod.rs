//! Prometheus metrics for the fusion pipeline.
//!
//! Library code records through the `metrics` facade; nothing is exported
//! until [`init`] installs the Prometheus recorder.

use once_cell::sync::OnceCell;
use std::error::Error;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const FUSION_REQUESTS: &str = "fusion_requests_total";
pub const SOURCE_FAILURES: &str = "source_failures_total";
pub const FUSION_TIMEOUTS: &str = "fusion_timeouts_total";
pub const FUSION_LATENCY: &str = "fusion_latency_seconds";
pub const CACHE_HITS: &str = "cache_hits_total";
pub const AGENT_ERRORS: &str = "agent_errors_total";

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialise the global Prometheus recorder.
///
/// Calling it multiple times is a no-op after the first success.
pub fn init() -> Result<(), Box<dyn Error + Send + Sync>> {
    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

/// Global Prometheus handle, `None` before [`init`].
pub fn handle() -> Option<&'static PrometheusHandle> {
    PROM_HANDLE.get()
}

/// Render the current metrics in the Prometheus exposition format.
pub fn render() -> String {
    handle().map(|h| h.render()).unwrap_or_default()
}

fn describe() {
    ::metrics::describe_counter!(FUSION_REQUESTS, "Fusion requests started");
    ::metrics::describe_counter!(SOURCE_FAILURES, "Source fetches converted to unavailable values");
    ::metrics::describe_counter!(FUSION_TIMEOUTS, "Source tasks aborted at the fusion deadline");
    ::metrics::describe_histogram!(FUSION_LATENCY, "Wall time of one fusion request");
    ::metrics::describe_counter!(CACHE_HITS, "Fresh cache reads");
    ::metrics::describe_counter!(AGENT_ERRORS, "Agent evaluations that returned an error");
}

pub fn record_source_failure(source: &'static str) {
    ::metrics::increment_counter!(SOURCE_FAILURES, "source" => source);
}

pub fn record_timeout(source: &'static str) {
    ::metrics::increment_counter!(FUSION_TIMEOUTS, "source" => source);
}

pub fn record_fusion(elapsed: Duration) {
    ::metrics::increment_counter!(FUSION_REQUESTS);
    ::metrics::histogram!(FUSION_LATENCY, elapsed.as_secs_f64());
}

pub fn record_agent_error(agent: String) {
    ::metrics::increment_counter!(AGENT_ERRORS, "agent" => agent);
}
