use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Windowed loan aggregates plus the collaborator's outstanding balance.
pub async fn loan_report(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::WindowQuery>,
) -> axum::response::Response {
    let (start, end) = match query.parse() {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match services.loan_report(start, end).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::report_error_to_response(e),
    }
}
