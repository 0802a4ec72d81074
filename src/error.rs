use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::model::leave_request::{ConflictingLeave, LeaveStatus};

/* =========================
Attendance rule violations
========================= */
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AttendanceError {
    #[error("clock-in is allowed between {window_start} and {window_end}, local time is {local_time}")]
    OutOfWindow {
        local_time: NaiveTime,
        window_start: NaiveTime,
        window_end: NaiveTime,
    },

    #[error("already clocked in today at {clock_in_at}")]
    AlreadyClockedIn {
        clock_in_at: DateTime<Utc>,
        can_clock_out: bool,
    },

    #[error("no clock-in found for {date}")]
    NotClockedIn { date: NaiveDate },

    #[error("already clocked out today at {clock_out_at}")]
    AlreadyClockedOut {
        clock_out_at: DateTime<Utc>,
        total_worked_hours: f64,
    },

    #[error("session too short: {elapsed_minutes} minutes elapsed, at least {minimum_minutes} required")]
    SessionTooShort {
        elapsed_minutes: i64,
        minimum_minutes: i64,
    },
}

/* =========================
Leave rule violations
========================= */
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum LeaveError {
    #[error("start date {start_date} is before today ({today})")]
    StartInPast {
        start_date: NaiveDate,
        today: NaiveDate,
    },

    #[error("end date {end_date} is before start date {start_date}")]
    EndBeforeStart {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },

    #[error("leave spans {total_days} days, the maximum is {max_days}")]
    ExceedsMaxSpan { total_days: i64, max_days: u32 },

    #[error("leave overlaps {} existing request(s)", .conflicts.len())]
    OverlapConflict { conflicts: Vec<ConflictingLeave> },

    #[error("leave request {leave_id} can no longer be cancelled ({status}, starts {start_date})")]
    NotCancellable {
        leave_id: u64,
        status: LeaveStatus,
        start_date: NaiveDate,
    },

    #[error("leave request {leave_id} was already {status}")]
    AlreadyReviewed { leave_id: u64, status: LeaveStatus },

    #[error("leave request {leave_id} not found")]
    #[serde(rename = "leave_request_not_found")]
    NotFound { leave_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/* =========================
Infrastructure failures
========================= */
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unreadable {entity} row: {detail}")]
    Corrupt { entity: &'static str, detail: String },

    #[error("write on {0} lost a concurrent race")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error(transparent)]
    Leave(#[from] LeaveError),

    #[error("employee {employee_id} not found")]
    EmployeeNotFound { employee_id: u64 },

    #[error("employee {employee_id} is not active")]
    EmployeeInactive { employee_id: u64 },

    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    fn details(&self) -> Value {
        match self {
            AppError::Attendance(e) => serde_json::to_value(e).unwrap_or_default(),
            AppError::Leave(e) => serde_json::to_value(e).unwrap_or_default(),
            AppError::EmployeeNotFound { employee_id } => {
                json!({ "code": "employee_not_found", "employee_id": employee_id })
            }
            AppError::EmployeeInactive { employee_id } => {
                json!({ "code": "employee_inactive", "employee_id": employee_id })
            }
            AppError::Validation(fields) => json!({ "code": "validation_failed", "fields": fields }),
            AppError::Store(_) => json!({ "code": "internal" }),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Attendance(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Leave(LeaveError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Leave(_) => StatusCode::BAD_REQUEST,
            AppError::EmployeeNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::EmployeeInactive { .. } => StatusCode::FORBIDDEN,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Store(e) = self {
            tracing::error!(error = %e, "Store failure");
            return HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            }));
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string(),
            "error": self.details(),
        }))
    }
}

/// Routes malformed JSON bodies into the same validation error shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(vec![FieldError::new("body", err.to_string())]).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(vec![FieldError::new("query", err.to_string())]).into()
}
