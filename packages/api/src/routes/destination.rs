use crate::{
    entity::webhook_destination,
    error::ApiError,
    middleware::admin::Operator,
    state::AppState,
    workflow::RegisterDestination,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_destinations).post(register_destination))
        .route(
            "/{record_id}",
            get(get_destination).delete(delete_destination),
        )
}

/// Destination record as exposed over the API, without its signing secret
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DestinationRecord {
    pub id: i32,
    pub source_id: String,
    pub destination_id: String,
    pub processor_id: i32,
    pub created_by: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

impl From<webhook_destination::Model> for DestinationRecord {
    fn from(model: webhook_destination::Model) -> Self {
        Self {
            id: model.id,
            source_id: model.source_id,
            destination_id: model.destination_id,
            processor_id: model.processor_id,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Active,
    Disabled,
    Missing,
    Unavailable,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DestinationDetail {
    #[serde(flatten)]
    pub record: DestinationRecord,
    pub remote_status: RemoteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisteredDestination {
    pub destination_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[utoipa::path(
    get,
    path = "/destinations",
    tag = "destinations",
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Destination records, newest first", body = Vec<DestinationRecord>)
    )
)]
#[tracing::instrument(name = "GET /destinations", skip(state))]
pub async fn list_destinations(
    State(state): State<AppState>,
) -> Result<Json<Vec<DestinationRecord>>, ApiError> {
    let records = state.registry.list().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/destinations",
    tag = "destinations",
    security(("admin_token" = [])),
    request_body = RegisterDestination,
    responses(
        (status = 201, description = "Destination registered", body = RegisteredDestination),
        (status = 400, description = "Unsupported processor type or invalid request"),
        (status = 404, description = "Payment processor not found"),
        (status = 502, description = "Routing service request failed")
    )
)]
#[tracing::instrument(name = "POST /destinations", skip(state, operator, request))]
pub async fn register_destination(
    State(state): State<AppState>,
    Extension(operator): Extension<Operator>,
    Json(request): Json<RegisterDestination>,
) -> Result<(StatusCode, Json<RegisteredDestination>), ApiError> {
    let destination_id = state.registrar.register(&request, &operator.0).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredDestination { destination_id }),
    ))
}

#[utoipa::path(
    get,
    path = "/destinations/{record_id}",
    tag = "destinations",
    security(("admin_token" = [])),
    params(("record_id" = i32, Path, description = "Local destination record id")),
    responses(
        (status = 200, description = "Record with its status in the routing service", body = DestinationDetail),
        (status = 404, description = "Record not found")
    )
)]
#[tracing::instrument(name = "GET /destinations/{record_id}", skip(state))]
pub async fn get_destination(
    State(state): State<AppState>,
    Path(record_id): Path<i32>,
) -> Result<Json<DestinationDetail>, ApiError> {
    let record = state
        .registry
        .get_by_id(record_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Destination record {}", record_id)))?;

    let remote = state
        .routing
        .get_destination(&record.source_id, &record.destination_id)
        .await;

    let (remote_status, url, description) = match remote {
        Ok(Some(destination)) => {
            let status = if destination.disabled {
                RemoteStatus::Disabled
            } else {
                RemoteStatus::Active
            };
            (status, Some(destination.url), Some(destination.description))
        }
        Ok(None) => (RemoteStatus::Missing, None, None),
        Err(e) => {
            tracing::warn!(
                destination_id = %record.destination_id,
                error = %e,
                "Failed to fetch destination from the routing service"
            );
            (RemoteStatus::Unavailable, None, None)
        }
    };

    Ok(Json(DestinationDetail {
        record: record.into(),
        remote_status,
        url,
        description,
    }))
}

#[utoipa::path(
    delete,
    path = "/destinations/{record_id}",
    tag = "destinations",
    security(("admin_token" = [])),
    params(("record_id" = i32, Path, description = "Local destination record id")),
    responses(
        (status = 200, description = "Whether a record was deleted", body = DeleteResponse)
    )
)]
#[tracing::instrument(name = "DELETE /destinations/{record_id}", skip(state))]
pub async fn delete_destination(
    State(state): State<AppState>,
    Path(record_id): Path<i32>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.remover.delete_destination(record_id).await?;
    Ok(Json(DeleteResponse { deleted }))
}
