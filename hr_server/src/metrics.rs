//! Prometheus metrics for monitoring server health.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener,
//! scrapable at `http://<metrics_bind>/metrics`.

#![allow(dead_code)] // Public surface; not every metric has a caller yet.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))
}

/// Count sessions created.
pub fn sessions_created_total() {
    metrics::counter!("hr_sessions_created_total").increment(1);
}

/// Count rooms created.
pub fn rooms_created_total() {
    metrics::counter!("hr_rooms_created_total").increment(1);
}

/// Count applied game actions by type (`check`, `call`, `bet`, `allin`,
/// `fold`, `reveal`).
pub fn game_actions_total(action: &str) {
    metrics::counter!("hr_game_actions_total", "action" => action.to_string()).increment(1);
}

/// Count quick-chat events posted.
pub fn quick_chats_sent_total() {
    metrics::counter!("hr_quick_chats_sent_total").increment(1);
}

/// Gauge of rooms currently alive.
pub fn rooms_active(count: usize) {
    metrics::gauge!("hr_rooms_active").set(count as f64);
}

/// Count idle users swept.
pub fn idle_users_swept_total(count: usize) {
    metrics::counter!("hr_idle_users_swept_total").increment(count as u64);
}
