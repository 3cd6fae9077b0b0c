use axum::{
    Router,
    routing::{get, post},
};

pub mod entries;
pub mod logs;
pub mod reports;
pub mod system;

/// Router for the ledger endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/logs", post(logs::submit_log_batch))
        .route("/entries", get(entries::list_entries))
        .route("/reports/loans", get(reports::loan_report))
}
