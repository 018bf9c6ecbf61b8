use std::io;

use thiserror::Error;

/// Error type shared by the ingestion pipeline, the snapshot store and the HTTP layer.
///
/// Messages carry the path or sheet name that failed so they can be logged centrally.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("spreadsheet could not be parsed: {0}")]
    Parse(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("io failure: {0}")]
    Io(String),
    #[error("serialization failure: {0}")]
    Serialization(String),
    #[error("template generation failed: {0}")]
    Template(String),
}

impl AppError {
    /// Short machine-readable tag used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFound",
            AppError::Parse(_) => "ParseError",
            AppError::Validation(_) => "ValidationError",
            AppError::Io(_) => "IOError",
            AppError::Serialization(_) => "SerializationError",
            AppError::Template(_) => "TemplateError",
        }
    }

    /// HTTP status code equivalent.
    pub fn status(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Parse(_) => 422,
            AppError::Validation(_) => 400,
            AppError::Io(_) | AppError::Serialization(_) | AppError::Template(_) => 500,
        }
    }

    /// Wraps an io error with the path it was raised for.
    pub fn io_at(path: &std::path::Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::NotFound(path.display().to_string())
        } else {
            AppError::Io(format!("{}: {}", path.display(), err))
        }
    }

    /// Wraps an io error raised while writing `path`. Always `Io`: a missing
    /// directory on the write path is a server fault, not a missing resource.
    pub fn write_failed(path: &std::path::Path, err: io::Error) -> Self {
        AppError::Io(format!("{}: {}", path.display(), err))
    }
}

impl From<io::Error> for AppError {
    fn from(value: io::Error) -> Self {
        if value.kind() == io::ErrorKind::NotFound {
            Self::NotFound(value.to_string())
        } else {
            Self::Io(value.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

impl From<calamine::Error> for AppError {
    fn from(value: calamine::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        Self::Template(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "web")]
mod response {
    use axum::{
        Json,
        extract::multipart::MultipartRejection,
        extract::rejection::{JsonRejection, PathRejection, QueryRejection},
        http::StatusCode,
        response::{IntoResponse, Response},
    };

    use super::AppError;

    // Extractor rejections render with the shared `{ error, details }` body.
    impl From<JsonRejection> for AppError {
        fn from(value: JsonRejection) -> Self {
            AppError::Validation(value.body_text())
        }
    }

    impl From<MultipartRejection> for AppError {
        fn from(value: MultipartRejection) -> Self {
            AppError::Validation(value.body_text())
        }
    }

    impl From<PathRejection> for AppError {
        fn from(value: PathRejection) -> Self {
            AppError::Validation(value.body_text())
        }
    }

    impl From<QueryRejection> for AppError {
        fn from(value: QueryRejection) -> Self {
            AppError::Validation(value.body_text())
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status =
                StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let body = Json(serde_json::json!({
                "error": self.kind(),
                "details": self.to_string(),
            }));
            (status, body).into_response()
        }
    }
}
