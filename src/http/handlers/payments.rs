use crate::domain::payment::{
    CreateAttemptRequest, ErrorEnvelope, PaymentError, RefundRequest, VerifyRequest,
    WebhookPayload,
};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

fn error_response(e: &PaymentError) -> axum::response::Response {
    let status = match e {
        PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
        PaymentError::GatewayTransport(_) => StatusCode::BAD_GATEWAY,
        PaymentError::GatewayBusiness(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PaymentError::AlreadyPaid | PaymentError::NotRefundable => StatusCode::CONFLICT,
        PaymentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if matches!(e, PaymentError::Store(_)) {
        tracing::error!(error = %e, "payment operation failed");
    }
    (status, Json(ErrorEnvelope::from_error(e))).into_response()
}

pub async fn create_attempt(
    State(state): State<AppState>,
    Json(req): Json<CreateAttemptRequest>,
) -> impl IntoResponse {
    match state.ledger_service.create_attempt(req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> impl IntoResponse {
    match state.ledger_service.confirm_by_polling(&req.payment_id).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Always acknowledges with 200; the gateway retries anything else
/// indefinitely. Storage failures are the one case worth letting the retry
/// machinery re-deliver.
pub async fn gateway_webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> impl IntoResponse {
    match state.ledger_service.apply_webhook(payload).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn request_refund(
    State(state): State<AppState>,
    Json(req): Json<RefundRequest>,
) -> impl IntoResponse {
    match state.ledger_service.request_refund(req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn booking_history(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> impl IntoResponse {
    match state.ledger_service.booking_history(&booking_id).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "booking_id": booking_id,
                "total_attempts": entries.len(),
                "attempts": entries,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn payment_settings(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.settings.clone()))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
