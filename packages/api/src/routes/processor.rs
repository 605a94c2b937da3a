use crate::{
    entity::payment_processor,
    error::ApiError,
    registry::NewProcessor,
    routes::destination::DeleteResponse,
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_processors).post(create_processor))
        .route("/{processor_id}", delete(delete_processor))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessorRecord {
    pub id: i32,
    pub name: String,
    pub processor_type: String,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<payment_processor::Model> for ProcessorRecord {
    fn from(model: payment_processor::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            processor_type: model.processor_type,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/processors",
    tag = "processors",
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Payment processors", body = Vec<ProcessorRecord>)
    )
)]
#[tracing::instrument(name = "GET /processors", skip(state))]
pub async fn list_processors(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProcessorRecord>>, ApiError> {
    let processors = state.registry.list_processors().await?;
    Ok(Json(processors.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/processors",
    tag = "processors",
    security(("admin_token" = [])),
    request_body = NewProcessor,
    responses(
        (status = 201, description = "Processor created", body = ProcessorRecord)
    )
)]
#[tracing::instrument(name = "POST /processors", skip(state, processor))]
pub async fn create_processor(
    State(state): State<AppState>,
    Json(processor): Json<NewProcessor>,
) -> Result<(StatusCode, Json<ProcessorRecord>), ApiError> {
    let processor = state.registry.create_processor(processor).await?;
    tracing::info!(
        processor_id = processor.id,
        processor_type = %processor.processor_type,
        "Created payment processor"
    );
    Ok((StatusCode::CREATED, Json(processor.into())))
}

#[utoipa::path(
    delete,
    path = "/processors/{processor_id}",
    tag = "processors",
    security(("admin_token" = [])),
    params(("processor_id" = i32, Path, description = "Payment processor id")),
    responses(
        (status = 200, description = "Whether the processor was deleted", body = DeleteResponse)
    )
)]
#[tracing::instrument(name = "DELETE /processors/{processor_id}", skip(state))]
pub async fn delete_processor(
    State(state): State<AppState>,
    Path(processor_id): Path<i32>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.remover.delete_processor(processor_id).await?;
    Ok(Json(DeleteResponse { deleted }))
}
