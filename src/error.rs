use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

pub type LeaveResult<T> = Result<T, LeaveError>;

/// Failures surfaced by the leave core.
///
/// Validation and capacity failures are recoverable by the filer (edit and
/// resubmit). Balance and booking failures happen inside the posting
/// transaction and leave the request `approved` until an operator intervenes.
#[derive(Debug, Display)]
pub enum LeaveError {
    #[display(fmt = "{}", message)]
    Validation {
        field: &'static str,
        message: String,
    },

    #[display(fmt = "staffing capacity exceeded: {}", summary)]
    Capacity {
        summary: String,
        reasons: Vec<String>,
    },

    #[display(
        fmt = "insufficient balance: {:.2} day(s) available, {:.2} requested",
        balance,
        requested
    )]
    InsufficientBalance { balance: f64, requested: f64 },

    #[display(
        fmt = "leave booking overlaps booking {} for the same leave type",
        conflicting_booking_id
    )]
    BookingConflict { conflicting_booking_id: i64 },

    #[display(fmt = "leave request {} status is not {} (found {})", request_id, expected, actual)]
    InvalidState {
        request_id: i64,
        expected: String,
        actual: String,
    },

    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl LeaveError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        LeaveError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn capacity(reasons: Vec<String>) -> Self {
        LeaveError::Capacity {
            summary: reasons.join("; "),
            reasons,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        LeaveError::NotFound(what.into())
    }

    /// Errors raised inside the posting transaction.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            LeaveError::InsufficientBalance { .. } | LeaveError::BookingConflict { .. }
        )
    }
}

impl std::error::Error for LeaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LeaveError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for LeaveError {
    fn from(e: sqlx::Error) -> Self {
        LeaveError::Database(e)
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LeaveError::Capacity { .. }
            | LeaveError::InsufficientBalance { .. }
            | LeaveError::BookingConflict { .. }
            | LeaveError::InvalidState { .. } => StatusCode::CONFLICT,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaveError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            LeaveError::Validation { field, message } => json!({
                "message": message,
                "field": field,
            }),
            LeaveError::Capacity { reasons, .. } => json!({
                "message": self.to_string(),
                "reasons": reasons,
            }),
            LeaveError::Database(e) => {
                tracing::error!(error = %e, "Leave operation failed on database");
                json!({ "message": "Internal Server Error" })
            }
            _ => json!({ "message": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_error_lists_every_reason() {
        let err = LeaveError::capacity(vec!["window A full".into(), "window B full".into()]);
        assert_eq!(
            err.to_string(),
            "staffing capacity exceeded: window A full; window B full"
        );
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn posting_twice_reads_as_status_not_approved() {
        let err = LeaveError::InvalidState {
            request_id: 9,
            expected: "approved".into(),
            actual: "posted".into(),
        };
        assert!(err.to_string().contains("status is not approved"));
        assert!(!err.is_integrity());
    }

    #[test]
    fn validation_maps_to_unprocessable() {
        let err = LeaveError::validation("med_cert", "a medical certificate is required");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(LeaveError::InsufficientBalance { balance: 1.0, requested: 2.0 }.is_integrity());
    }
}
