//! Metrics collection and exposition.
//!
//! # Metrics
//! - `minsig_submissions_total` (counter): submissions by outcome
//! - `minsig_rendezvous_total` (counter): finished waits by result
//! - `minsig_open_slots` (gauge): slots waiting for an answer
//! - `minsig_rendezvous_wait_seconds` (histogram): offerer wait time

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one submission. `outcome` is offerer, reflected, delivered,
/// rejected or closed.
pub fn record_submission(outcome: &'static str) {
    counter!("minsig_submissions_total", "outcome" => outcome).increment(1);
}

/// Record the end of an offerer's wait.
pub fn record_rendezvous(result: &'static str, waited: Duration) {
    counter!("minsig_rendezvous_total", "result" => result).increment(1);
    histogram!("minsig_rendezvous_wait_seconds", "result" => result).record(waited.as_secs_f64());
}

pub fn set_open_slots(count: usize) {
    gauge!("minsig_open_slots").set(count as f64);
}
