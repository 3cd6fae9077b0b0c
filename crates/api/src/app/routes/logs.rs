use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Accept a transaction's logs for asynchronous recording.
///
/// Returns `202` once the batch is on the bus; recording happens on the worker.
pub async fn submit_log_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LogBatchRequest>,
) -> axum::response::Response {
    let batch = match body.into_batch() {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let signature = batch.signature().clone();
    let lines = batch.logs().len();
    match services.publish(batch) {
        Ok(delivery_id) => {
            tracing::debug!(%signature, %delivery_id, lines, "log batch accepted");
            (StatusCode::ACCEPTED, Json(dto::AcceptedResponse { delivery_id })).into_response()
        }
        Err(e) => {
            tracing::error!(%signature, error = %e, "failed to publish log batch");
            errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "bus_unavailable", e.to_string())
        }
    }
}
