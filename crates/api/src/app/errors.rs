use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use loanledger_infra::reporter::ReportError;

pub fn report_error_to_response(err: ReportError) -> axum::response::Response {
    match err {
        ReportError::InvalidWindow(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_window", msg)
        }
        ReportError::StoreRead(e) => {
            tracing::warn!(error = %e, "ledger read failed");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", e.to_string())
        }
        ReportError::CollaboratorUnavailable(e) => {
            tracing::warn!(error = %e, "loan status unavailable");
            json_error(StatusCode::BAD_GATEWAY, "loan_status_unavailable", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
