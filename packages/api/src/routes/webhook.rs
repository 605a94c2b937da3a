use crate::{error::ApiError, state::AppState, workflow::VerificationResult};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use relay_routing::signature::is_routed_request;

pub fn routes() -> Router<AppState> {
    Router::new().route("/{processor_type}", post(receive_webhook))
}

/// Inbound webhook forwarded by the routing service
///
/// The body is verified byte for byte, so it is taken as raw [`Bytes`].
#[utoipa::path(
    post,
    path = "/webhook/{processor_type}",
    tag = "webhook",
    params(("processor_type" = String, Path, description = "Processor family, e.g. stripe")),
    request_body(content = String, description = "Raw webhook payload"),
    responses(
        (status = 200, description = "Signature verified", body = VerificationResult),
        (status = 400, description = "Request was not forwarded by the routing service"),
        (status = 401, description = "Signature rejected", body = VerificationResult)
    )
)]
#[tracing::instrument(name = "POST /webhook/{processor_type}", skip(state, headers, payload))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(processor_type): Path<String>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<(StatusCode, Json<VerificationResult>), ApiError> {
    if !is_routed_request(&headers) {
        return Err(ApiError::bad_request(
            "Request was not forwarded by the routing service",
        ));
    }

    let result = state
        .verifier
        .verify_request(&payload, &processor_type, &headers)
        .await;

    let status = if result.valid {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    Ok((status, Json(result)))
}
