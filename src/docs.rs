use crate::api::attendance::ClockResponse;
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::model::attendance::{AttendanceStatus, ClockRecord};
use crate::model::leave_request::{ConflictingLeave, LeaveRequest, LeaveStatus, LeaveType};
use crate::services::attendance::{DayPhase, TodayStatus};
use crate::services::overlap::Availability;
use crate::services::stats::{
    AttendanceSummary, EmployeeAttendanceSummary, LeaveSummary, LeaveTally,
};
use crate::utils::date_range::DateRange;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance & Leave API",
        version = "1.0.0",
        description = r#"
## Attendance & Leave

Daily clock-in/clock-out tracking with derived worked hours and overtime, and
leave requests that never overlap an employee's own pending or approved leave.

### 🔹 Key Features
- **Attendance**
  - One clock-in/clock-out cycle per employee per day, inside the clock-in window
  - Live status for the current day, history, summaries and team reports
- **Leave**
  - Availability check, request, cancel while pending, approve/reject
  - Summaries grouped by status and leave type

### 🔐 Security
Every `/api` endpoint requires a **JWT Bearer** access token.
Reviews, team reports and the full leave list are limited to **Admin** and **HR**.

### ⚠️ Errors
Rejections return `{"message": ..., "error": {"code": ..., ...}}` with the
context needed to explain the refusal (for example the conflicting requests).

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::today,
        crate::api::attendance::history,
        crate::api::attendance::summary,
        crate::api::attendance::report,

        crate::api::leave_request::check_availability,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::my_leave,
        crate::api::leave_request::leave_summary,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave
    ),
    components(
        schemas(
            ClockRecord,
            AttendanceStatus,
            ClockResponse,
            TodayStatus,
            DayPhase,
            DateRange,
            AttendanceSummary,
            EmployeeAttendanceSummary,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            ConflictingLeave,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            Availability,
            LeaveTally,
            LeaveSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Clock-in/clock-out and attendance statistics"),
        (name = "Leave", description = "Leave requests, availability and review"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
