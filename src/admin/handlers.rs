use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub open_slots: usize,
    pub oldest_wait_secs: Option<u64>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let stats = state.table.stats();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: (if stats.closed { "shutting_down" } else { "operational" }).to_string(),
        open_slots: stats.open_slots,
        oldest_wait_secs: stats.oldest_wait.map(|d| d.as_secs()),
    })
}
