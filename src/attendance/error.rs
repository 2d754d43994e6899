use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;

/// Everything that can go wrong while mutating attendance. None of these are
/// fatal; at worst one control shows a stale state until the user retries.
#[derive(Debug, Display)]
pub enum AttendanceError {
    /// Mutation attempted on a locked date (past day or past the cutoff).
    #[display(fmt = "{}", reason)]
    LockedDay { reason: String },

    /// Early pickup toggled without a qualifying daily status. No write is
    /// issued when this is raised.
    #[display(fmt = "{}", message)]
    Precondition { message: String },

    /// Malformed payload: unknown checkpoint, unparseable status, empty ids.
    #[display(fmt = "{}", message)]
    Validation { message: String },

    /// Persistence failure; the caller rolls back its optimistic state.
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

impl AttendanceError {
    pub fn precondition(message: impl Into<String>) -> Self {
        AttendanceError::Precondition {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AttendanceError::Validation {
            message: message.into(),
        }
    }
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        AttendanceError::Store(e)
    }
}

impl actix_web::ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::LockedDay { .. } => StatusCode::FORBIDDEN,
            AttendanceError::Precondition { .. } => StatusCode::CONFLICT,
            AttendanceError::Validation { .. } => StatusCode::BAD_REQUEST,
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AttendanceError::Store(e) = self {
            tracing::error!(error = %e, "Attendance store failure");
            // Do not leak database details to the client
            return HttpResponse::InternalServerError().json(json!({
                "error": "An internal error occurred"
            }));
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
