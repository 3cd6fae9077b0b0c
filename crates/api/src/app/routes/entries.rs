use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::WindowQuery>,
) -> axum::response::Response {
    let (start, end) = match query.parse() {
        Ok(w) => w,
        Err(resp) => return resp,
    };

    match services.entries(start, end).await {
        Ok(items) => (StatusCode::OK, Json(dto::ItemsResponse { items })).into_response(),
        Err(e) => errors::report_error_to_response(e),
    }
}
