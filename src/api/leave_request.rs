use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::LeaveService;
use crate::leave::workflow::{CreateLeaveRequestInput, LeaveDayInput};
use crate::model::leave_request::{LeaveRequest, LeaveRequestFilter, LeaveStatus};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveRequest {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[serde(default)]
    pub is_hourly_based: bool,
    #[serde(default)]
    #[schema(example = "Family event")]
    pub reason: String,
    #[schema(example = 2.0)]
    pub total_days: f64,
    /// One entry per calendar day
    pub days: Vec<LeaveDayInput>,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectLeaveRequest {
    #[schema(example = "Team is short-staffed that week")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveRequestQuery {
    /// Filter by user (employee) id
    #[schema(example = 1000)]
    pub user_id: Option<u64>,
    /// Filter by status: pending, approved or rejected
    #[param(value_type = Option<String>)]
    #[schema(value_type = Option<String>, example = "pending")]
    pub status: Option<LeaveStatus>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveRequestListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Create leave request
========================= */
/// Submit a leave request for the calling employee
#[utoipa::path(
    post,
    path = "/api/leave/requests",
    request_body(
        content = CreateLeaveRequest,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Validation failed or balance exceeded", body = Object, example = json!({
            "message": "insufficient leave balance: 1.5 days remaining"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type or balance not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave_request(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    payload: web::Json<CreateLeaveRequest>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.leave_user_id()?;
    let payload = payload.into_inner();

    let request = svc
        .create_leave_request(CreateLeaveRequestInput {
            user_id,
            leave_type_id: payload.leave_type_id,
            is_hourly_based: payload.is_hourly_based,
            reason: payload.reason,
            total_days: payload.total_days,
            days: payload.days,
        })
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/// Leave requests of the calling employee, newest first
#[utoipa::path(
    get,
    path = "/api/leave/requests/mine",
    responses(
        (status = 200, description = "Own leave requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leave_requests(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.leave_user_id()?;
    let requests = svc.list_requests_for_user(user_id).await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Paginated leave requests (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/leave/requests",
    params(LeaveRequestQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveRequestListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_leave_requests(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    query: web::Query<LeaveRequestQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let query = query.into_inner();
    let filter = LeaveRequestFilter::new(query.user_id, query.status, query.page, query.per_page);
    let (data, total) = svc.list_requests(&filter).await?;

    Ok(HttpResponse::Ok().json(LeaveRequestListResponse {
        data,
        page: filter.page,
        per_page: filter.per_page,
        total,
    }))
}

/// A single leave request with its days
#[utoipa::path(
    get,
    path = "/api/leave/requests/{request_id}",
    params(
        ("request_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "leave request 7 not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave_request(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = svc.get_request(path.into_inner()).await?;

    if !auth.is_hr_or_admin() && auth.employee_id != Some(request.user_id) {
        return Err(actix_web::error::ErrorForbidden("Not your leave request"));
    }

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Approve / reject (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/requests/{request_id}/approve",
    params(
        ("request_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 400, description = "Leave request already processed", body = Object, example = json!({
            "message": "leave request 7 not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave_request(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let request = svc.approve_request(path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/requests/{request_id}/reject",
    params(
        ("request_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(
        content = RejectLeaveRequest,
        description = "Optional rejection reason",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Leave request already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave_request(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: Option<web::Json<RejectLeaveRequest>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let reason = payload
        .and_then(|p| p.into_inner().reason)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let request = svc
        .reject_request(path.into_inner(), auth.user_id, reason)
        .await?;

    Ok(HttpResponse::Ok().json(request))
}
