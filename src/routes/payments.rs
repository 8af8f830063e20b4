use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::PaymentCallbackRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/callback", post(payment_callback))
        .route("/{id}", get(get_payment))
}

/// Provider webhook. Authenticated by the shared `X-Callback-Token` header,
/// not a bearer token.
#[utoipa::path(
    post,
    path = "/api/payments/callback",
    request_body = PaymentCallbackRequest,
    params(
        ("X-Callback-Token" = String, Header, description = "Shared callback secret")
    ),
    responses(
        (status = 200, description = "Payment state applied", body = ApiResponse<Payment>),
        (status = 400, description = "Unknown status or amount mismatch"),
        (status = 401, description = "Bad callback token"),
        (status = 404, description = "Unknown payment reference"),
    ),
    tag = "Payments"
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PaymentCallbackRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let token = headers
        .get("x-callback-token")
        .and_then(|value| value.to_str().ok());
    let resp = payment_service::handle_callback(&state, token, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Payment>),
        (status = 403, description = "Not the payer"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::get_payment(&state, &user, id).await?;
    Ok(Json(resp))
}
