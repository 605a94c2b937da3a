use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use relay_routing::{FilterError, ProcessorType, RoutingError, UnsupportedProcessor};
use serde::Serialize;

/// Failures of the registration and deletion workflows
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    UnsupportedProcessor(#[from] UnsupportedProcessor),

    #[error("No routing source configured for {processor_type} (setting `{setting}`)")]
    MissingSourceConfiguration {
        processor_type: ProcessorType,
        setting: &'static str,
    },

    #[error("Routing service request failed: {0}")]
    RemoteApiFailure(#[from] RoutingError),

    #[error("Registry error: {0}")]
    Registry(#[from] sea_orm::DbErr),

    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl RelayError {
    pub fn missing_source(processor_type: ProcessorType) -> Self {
        Self::MissingSourceConfiguration {
            processor_type,
            setting: processor_type.source_setting(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportPolicy {
    Ignore,
    Report,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    public_code: String,
    public_message: Option<String>,
    report_policy: ReportPolicy,
}

impl ApiError {
    fn new(
        status: StatusCode,
        public_code: impl Into<String>,
        public_message: Option<String>,
        report_policy: ReportPolicy,
    ) -> Self {
        Self {
            status,
            public_code: public_code.into(),
            public_message,
            report_policy,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Not found: {}", msg);
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            Some(msg),
            ReportPolicy::Ignore,
        )
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            Some(msg),
            ReportPolicy::Ignore,
        )
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Unauthorized: {}", msg);
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            Some(msg),
            ReportPolicy::Ignore,
        )
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Forbidden: {}", msg);
        Self::new(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            Some(msg),
            ReportPolicy::Ignore,
        )
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Bad gateway: {}", msg);
        Self::new(
            StatusCode::BAD_GATEWAY,
            "ROUTING_SERVICE_ERROR",
            Some("Routing service request failed".to_string()),
            ReportPolicy::Report,
        )
    }

    pub fn misconfigured(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!("Misconfigured: {}", msg);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "MISSING_CONFIGURATION",
            Some(msg),
            ReportPolicy::Report,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorEnvelope<'a> {
            error: ErrorBody<'a>,
        }

        #[derive(Serialize)]
        struct ErrorBody<'a> {
            code: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<&'a str>,
            message: &'a str,
        }

        let public_message = self
            .public_message
            .as_deref()
            .unwrap_or_else(|| self.status.canonical_reason().unwrap_or("Error"));

        let error_id = (self.report_policy == ReportPolicy::Report)
            .then(|| uuid::Uuid::new_v4().to_string());

        if let Some(id) = error_id.as_deref() {
            tracing::error!(
                error_id = id,
                status = self.status.as_u16(),
                code = %self.public_code,
                "Reported API error"
            );
        }

        let mut response = (
            self.status,
            Json(ErrorEnvelope {
                error: ErrorBody {
                    code: &self.public_code,
                    id: error_id.as_deref(),
                    message: public_message,
                },
            }),
        )
            .into_response();

        if let Some(id) = error_id.as_deref() {
            if let Ok(v) = HeaderValue::from_str(id) {
                response.headers_mut().insert("x-error-id", v);
            }
        }

        response
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::UnsupportedProcessor(_)
            | RelayError::InvalidFilter(_)
            | RelayError::InvalidRequest(_) => Self::bad_request(err.to_string()),
            RelayError::MissingSourceConfiguration { .. } => Self::misconfigured(err.to_string()),
            RelayError::RemoteApiFailure(_) => Self::bad_gateway(err.to_string()),
            RelayError::Registry(db_err) => db_err.into(),
            RelayError::NotFound(msg) => Self::not_found(msg),
        }
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        tracing::error!("Database error: {:?}", err);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "DATABASE_ERROR",
            None,
            ReportPolicy::Report,
        )
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.public_code.as_str())
    }
}
