//! Errors raised by the Graph API client.

use adrules_domain::error::UpstreamError;

/// Service name reported in [`UpstreamError`]s.
pub const SERVICE: &str = "graph_api";

#[derive(Debug, thiserror::Error)]
pub enum GraphApiError {
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    Setup(#[source] reqwest::Error),

    /// The request could not be sent or its body could not be read.
    #[error("http request failed")]
    Http(#[from] reqwest::Error),

    /// The response body is not the expected JSON shape.
    #[error("malformed response body")]
    Json(#[from] serde_json::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}`: {value}")]
    InvalidValue { field: String, value: String },
}

impl From<GraphApiError> for UpstreamError {
    fn from(err: GraphApiError) -> Self {
        match err {
            GraphApiError::Api { status, message } => Self::Status {
                service: SERVICE,
                status,
                message,
            },
            GraphApiError::MissingField(field) => Self::MissingField {
                service: SERVICE,
                field: field.to_string(),
            },
            GraphApiError::InvalidValue { field, value } => Self::InvalidValue {
                service: SERVICE,
                field,
                value,
            },
            other @ (GraphApiError::Setup(_) | GraphApiError::Http(_) | GraphApiError::Json(_)) => {
                Self::Transport {
                    service: SERVICE,
                    source: Box::new(other),
                }
            }
        }
    }
}
