use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tertulia_core::retrieval::RetrievalError;
use tertulia_core::{AgentError, ModelClientError};

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required input is missing or blank.
    #[error("{0}")]
    Validation(String),

    /// The model answered with text that doesn't fit the expected schema.
    #[error("the model response could not be parsed: {0}")]
    Parse(String),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Model(#[from] ModelClientError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Parse(_) => StatusCode::BAD_REQUEST,
            ApiError::Agent(_) | ApiError::Model(_) | ApiError::Retrieval(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Only validation messages reach the caller verbatim.
    fn public_message(&self) -> String {
        match self {
            ApiError::Validation(message) => message.clone(),
            ApiError::Parse(_) => {
                "No se pudo interpretar la respuesta del modelo".to_owned()
            }
            ApiError::Agent(AgentError::ToolLoopExceeded(_)) => {
                "El asistente no llegó a una respuesta".to_owned()
            }
            ApiError::Agent(_) | ApiError::Model(_) => {
                "El modelo no está disponible".to_owned()
            }
            ApiError::Retrieval(_) => "La búsqueda de contexto falló".to_owned(),
        }
    }
}

/// The JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            debug!("rejected request: {self}");
        }
        let body = ErrorBody {
            status: status.as_u16(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Returns the trimmed `value`, or a validation error naming `param`.
pub fn require_param(value: Option<String>, param: &str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_owned()),
        _ => Err(ApiError::Validation(format!(
            "el parámetro `{param}` es obligatorio"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use tertulia_model::ErrorKind;

    use super::*;

    #[test]
    fn test_require_param() {
        assert_eq!(require_param(Some(" hola ".into()), "message").unwrap(), "hola");
        for value in [None, Some(String::new()), Some(" \n\t".into())] {
            let err = require_param(value, "message").unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert!(err.to_string().contains("`message`"));
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Parse("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Agent(AgentError::Closed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let err = ApiError::Retrieval(RetrievalError::Embedding {
            kind: ErrorKind::Network,
            message: "down".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parse_details_stay_private() {
        let err = ApiError::Parse("expected value at line 1 column 1".into());
        assert!(!err.public_message().contains("line 1"));
    }
}
