//! HTTP handlers for the server.

pub mod render;
pub mod templates;

use axum::http::StatusCode;

use crate::error::FolioError;

/// Map a library error to a status code and message.
pub(crate) fn error_status(e: FolioError) -> (StatusCode, String) {
    let status = match &e {
        FolioError::NotFound(_) => StatusCode::NOT_FOUND,
        FolioError::Parse(_)
        | FolioError::InvalidTemplate(_)
        | FolioError::CyclicPartial(_)
        | FolioError::Store(_) => StatusCode::BAD_REQUEST,
        FolioError::MissingRequired(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FolioError::Render(_) | FolioError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}
