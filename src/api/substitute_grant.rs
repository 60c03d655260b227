use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::leave_type::UserQuery;
use crate::auth::auth::AuthUser;
use crate::leave::LeaveService;
use crate::leave::grant_ledger::GrantFields;

#[derive(Deserialize, ToSchema)]
pub struct CreateGrant {
    #[schema(example = 1000)]
    pub user_id: u64,
    #[serde(flatten)]
    pub fields: GrantFields,
}

#[derive(Deserialize, ToSchema)]
pub struct ReconcileGrants {
    #[schema(example = 1000)]
    pub user_id: u64,
}

/// Substitute leave grants with their current expiry state
#[utoipa::path(
    get,
    path = "/api/leave/substitute-grants",
    params(UserQuery),
    responses(
        (status = 200, description = "Grants in creation order", body = [SubstituteLeaveGrant]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Substitute leave"
)]
pub async fn list_grants(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.resolve_user(query.user_id)?;
    let grants = svc.list_grants(user_id).await?;
    Ok(HttpResponse::Ok().json(grants))
}

/// Totals over the grants that have not expired, plus the grants
#[utoipa::path(
    get,
    path = "/api/leave/substitute-grants/summary",
    params(UserQuery),
    responses(
        (status = 200, description = "Grant totals", body = GrantSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Substitute leave"
)]
pub async fn grant_summary(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.resolve_user(query.user_id)?;
    let summary = svc.grant_summary(user_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/* =========================
Grant lifecycle (HR/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/substitute-grants",
    request_body(
        content = CreateGrant,
        description = "Grant payload, dates as YYYY-MM-DD",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Grant created", body = SubstituteLeaveGrant),
        (status = 400, description = "Invalid grant", body = Object, example = json!({
            "message": "expire date cannot be before grant date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Substitute leave type or balance not configured")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Substitute leave"
)]
pub async fn create_grant(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    payload: web::Json<CreateGrant>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let grant = svc.create_grant(payload.user_id, &payload.fields).await?;
    Ok(HttpResponse::Created().json(grant))
}

#[utoipa::path(
    put,
    path = "/api/leave/substitute-grants/{grant_id}",
    params(
        ("grant_id" = u64, Path, description = "ID of the grant to update")
    ),
    request_body(
        content = GrantFields,
        description = "Replacement grant fields",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Grant updated", body = SubstituteLeaveGrant),
        (status = 400, description = "Invalid grant or granted days below used days"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Grant not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Substitute leave"
)]
pub async fn update_grant(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    path: web::Path<u64>,
    payload: web::Json<GrantFields>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let grant = svc.update_grant(path.into_inner(), &payload).await?;
    Ok(HttpResponse::Ok().json(grant))
}

#[utoipa::path(
    delete,
    path = "/api/leave/substitute-grants/{grant_id}",
    params(
        ("grant_id" = u64, Path, description = "ID of the grant to delete")
    ),
    responses(
        (status = 200, description = "Grant deleted", body = Object, example = json!({
            "message": "Substitute leave grant deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Grant not found"),
        (status = 409, description = "Grant already has used days")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Substitute leave"
)]
pub async fn delete_grant(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    svc.delete_grant(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Substitute leave grant deleted"
    })))
}

/// Persists expiry of lapsed grants and rebuilds the substitute balance
#[utoipa::path(
    post,
    path = "/api/leave/substitute-grants/reconcile",
    request_body(
        content = ReconcileGrants,
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Expired grants reconciled", body = Object, example = json!({
            "message": "Expired grants reconciled",
            "expired": 1
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Substitute leave"
)]
pub async fn reconcile_grants(
    auth: AuthUser,
    svc: web::Data<LeaveService>,
    payload: web::Json<ReconcileGrants>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let expired = svc.reconcile_expired_grants(payload.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Expired grants reconciled",
        "expired": expired
    })))
}
