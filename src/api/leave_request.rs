use crate::auth::auth::AuthUser;
use crate::error::{AppError, FieldError, LeaveError};
use crate::model::leave_request::{LeaveDecision, LeaveRequest, LeaveStatus, LeaveType};
use crate::services::leave::LeaveService;
use crate::store::LeavePageQuery;
use crate::utils::clock::Clock;
use crate::utils::date_range::RangeQuery;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const MAX_REASON_CHARS: usize = 500;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = "annual")]
    pub leave_type: Option<LeaveType>, // enum ensures Swagger dropdown
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
}

/// A create payload with every required field present.
#[derive(Debug)]
pub struct ValidCreateLeave {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub reason: String,
}

impl CreateLeave {
    /// Reports every missing or malformed field at once.
    pub fn validate(self) -> Result<ValidCreateLeave, AppError> {
        let mut errors = Vec::new();
        if self.start_date.is_none() {
            errors.push(FieldError::new("start_date", "is required"));
        }
        if self.end_date.is_none() {
            errors.push(FieldError::new("end_date", "is required"));
        }
        if self.leave_type.is_none() {
            errors.push(FieldError::new("leave_type", "is required"));
        }
        let reason = self.reason.as_deref().map(str::trim).unwrap_or_default();
        if reason.is_empty() {
            errors.push(FieldError::new("reason", "is required"));
        } else if reason.chars().count() > MAX_REASON_CHARS {
            errors.push(FieldError::new(
                "reason",
                format!("must be at most {MAX_REASON_CHARS} characters"),
            ));
        }

        match (self.start_date, self.end_date, self.leave_type) {
            (Some(start_date), Some(end_date), Some(leave_type)) if errors.is_empty() => {
                Ok(ValidCreateLeave {
                    start_date,
                    end_date,
                    leave_type,
                    reason: reason.to_string(),
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    #[param(value_type = String, example = "2026-01-05")]
    pub start_date: NaiveDate,
    #[param(value_type = String, example = "2026-01-07")]
    pub end_date: NaiveDate,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MineQuery {
    /// Only requests in this status
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<LeaveStatus>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    #[param(value_type = Option<String>)]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Availability
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Whether the span can be requested", body = crate::services::overlap::Availability),
        (status = 400, description = "Malformed dates"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn check_availability(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    clock: web::Data<dyn Clock>,
    query: web::Query<AvailabilityQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let availability = service
        .check_availability(employee_id, query.start_date, query.end_date, clock.today())
        .await?;

    Ok(HttpResponse::Ok().json(availability))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid span or overlapping request", body = Object, example = json!({
            "message": "leave overlaps 1 existing request(s)",
            "error": {
                "code": "overlap_conflict",
                "conflicts": [{
                    "id": 1,
                    "leave_type": "annual",
                    "start_date": "2026-01-05",
                    "end_date": "2026-01-07",
                    "status": "pending"
                }]
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile or employee inactive")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    clock: web::Data<dyn Clock>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.into_inner().validate()?;

    let now = clock.now();
    let created = service
        .create_request(
            employee_id,
            payload.leave_type,
            payload.start_date,
            payload.end_date,
            payload.reason,
            now.date_naive(),
            now.with_timezone(&Utc),
        )
        .await?;

    Ok(HttpResponse::Created().json(created))
}

/* =========================
Own requests
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/mine",
    params(MineQuery),
    responses(
        (status = 200, description = "Caller's requests by start date", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<MineQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let statuses: Vec<LeaveStatus> = query.status.into_iter().collect();
    let requests = service.list_own(employee_id, &statuses).await?;
    Ok(HttpResponse::Ok().json(requests))
}

#[utoipa::path(
    get,
    path = "/api/leave/summary",
    params(RangeQuery),
    responses(
        (status = 200, description = "Caller's leave grouped by status and type", body = crate::services::stats::LeaveSummary),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_summary(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    clock: web::Data<dyn Clock>,
    range: web::Query<RangeQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let range = range.resolve(clock.today())?;
    let summary = service.summary(employee_id, range).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/* =========================
Cancel (owner)
========================= */
#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave request cancelled", body = Object, example = json!({
            "message": "Leave request cancelled"
        })),
        (status = 400, description = "Request already started or reviewed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No such request for this employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let leave_id = path.into_inner();

    service
        .cancel_request(leave_id, employee_id, clock.today())
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request cancelled"
    })))
}

/* =========================
Approve / reject (HR/Admin)
========================= */
async fn review(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    clock: web::Data<dyn Clock>,
    leave_id: u64,
    decision: LeaveDecision,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let reviewed = service
        .review_request(
            leave_id,
            auth.user_id,
            decision,
            clock.now().with_timezone(&Utc),
        )
        .await?;

    Ok(HttpResponse::Ok().json(reviewed))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 400, description = "Leave request already reviewed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    review(auth, service, clock, path.into_inner(), LeaveDecision::Approve).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Leave request already reviewed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    clock: web::Data<dyn Clock>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    review(auth, service, clock, path.into_inner(), LeaveDecision::Reject).await
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();
    let request = service.get_request(leave_id).await?;

    // other employees' requests are reported as missing
    if !auth.can_view_employee(request.employee_id) {
        return Err(AppError::from(LeaveError::NotFound { leave_id }).into());
    }

    Ok(HttpResponse::Ok().json(request))
}

fn page_out_of_range() -> AppError {
    AppError::Validation(vec![FieldError::new("page", "page number is too large")])
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveService>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let page_number = u32::try_from(page).map_err(|_| page_out_of_range())?;
    let offset = (page - 1)
        .checked_mul(per_page)
        .ok_or_else(page_out_of_range)?;

    let (data, total) = service
        .list_page(&LeavePageQuery {
            employee_id: query.employee_id,
            status: query.status,
            limit: per_page,
            offset,
        })
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page_number,
        per_page: per_page as u32,
        total,
    }))
}
