use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Local};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::leave::LeaveService;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Whose data to read; HR/Admin only, defaults to the caller
    #[schema(example = 1000)]
    pub user_id: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HolidayQuery {
    /// Calendar year, defaults to the current one
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

/// Active leave types in display order
#[utoipa::path(
    get,
    path = "/api/leave/types",
    responses(
        (status = 200, description = "Leave types", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    svc: web::Data<LeaveService>,
) -> actix_web::Result<impl Responder> {
    let types = svc.list_leave_types().await?;
    Ok(HttpResponse::Ok().json(types))
}

/// Leave balances per leave type
#[utoipa::path(
    get,
    path = "/api/leave/balances",
    params(UserQuery),
    responses(
        (status = 200, description = "Leave balances", body = [BalanceView]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_balances(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.resolve_user(query.user_id)?;
    let balances = svc.list_balances(user_id).await?;
    Ok(HttpResponse::Ok().json(balances))
}

/// Public holidays of a year
#[utoipa::path(
    get,
    path = "/api/leave/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holidays ordered by date", body = [Holiday]),
        (status = 400, description = "Invalid year"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    svc: web::Data<LeaveService>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.unwrap_or_else(|| Local::now().year());
    let holidays = svc.holidays(year).await?;
    Ok(HttpResponse::Ok().json(holidays))
}
