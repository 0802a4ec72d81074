use crate::auth::auth::AuthUser;
use crate::model::attendance::ClockRecord;
use crate::services::attendance::AttendanceService;
use crate::utils::clock::Clock;
use crate::utils::date_range::RangeQuery;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct ClockResponse {
    #[schema(example = "Clocked in")]
    pub message: String,
    pub data: ClockRecord,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Another employee's records (HR/Admin only); defaults to the caller
    pub employee_id: Option<u64>,
}

impl EmployeeQuery {
    fn target(&self, auth: &AuthUser) -> actix_web::Result<u64> {
        match self.employee_id {
            Some(id) if auth.can_view_employee(id) => Ok(id),
            Some(_) => Err(actix_web::error::ErrorForbidden("HR/Admin only")),
            None => auth.require_employee(),
        }
    }
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    responses(
        (status = 200, description = "Clocked in", body = ClockResponse),
        (status = 400, description = "Outside the clock-in window or already clocked in today", body = Object, example = json!({
            "message": "already clocked in today at 2026-01-05 09:00:00 UTC",
            "error": {
                "code": "already_clocked_in",
                "clock_in_at": "2026-01-05T09:00:00Z",
                "can_clock_out": true
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile or employee inactive"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let record = service.clock_in(employee_id, clock.now()).await?;

    Ok(HttpResponse::Ok().json(ClockResponse {
        message: "Clocked in".to_string(),
        data: record,
    }))
}

/// Clock-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out, hours derived", body = ClockResponse),
        (status = 400, description = "Not clocked in, already clocked out or session too short", body = Object, example = json!({
            "message": "session too short: 5 minutes elapsed, at least 10 required",
            "error": {
                "code": "session_too_short",
                "elapsed_minutes": 5,
                "minimum_minutes": 10
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile or employee inactive"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let record = service.clock_out(employee_id, clock.now()).await?;

    Ok(HttpResponse::Ok().json(ClockResponse {
        message: "Clocked out".to_string(),
        data: record,
    }))
}

/// Live status of the caller's day
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's state", body = crate::services::attendance::TodayStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let status = service.today_status(employee_id, clock.now()).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Attendance records for a range
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(RangeQuery, EmployeeQuery),
    responses(
        (status = 200, description = "Records ordered by date", body = [ClockRecord]),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    clock: web::Data<dyn Clock>,
    range: web::Query<RangeQuery>,
    who: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = who.target(&auth)?;
    let range = range.resolve(clock.today())?;
    let records = service.history(employee_id, range).await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Attendance statistics for a range
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(RangeQuery, EmployeeQuery),
    responses(
        (status = 200, description = "Aggregated attendance", body = crate::services::stats::AttendanceSummary),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn summary(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    clock: web::Data<dyn Clock>,
    range: web::Query<RangeQuery>,
    who: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = who.target(&auth)?;
    let range = range.resolve(clock.today())?;
    let summary = service.summary(employee_id, range).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Per-employee attendance report (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/report",
    params(RangeQuery),
    responses(
        (status = 200, description = "One summary per employee with records in range", body = [crate::services::stats::EmployeeAttendanceSummary]),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn report(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    clock: web::Data<dyn Clock>,
    range: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let range = range.resolve(clock.today())?;
    let report = service.team_report(range).await?;
    Ok(HttpResponse::Ok().json(report))
}
