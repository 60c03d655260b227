use crate::api::leave_request::{
    CreateLeaveRequest, LeaveRequestListResponse, LeaveRequestQuery, RejectLeaveRequest,
};
use crate::api::leave_type::{HolidayQuery, UserQuery};
use crate::api::substitute_grant::{CreateGrant, ReconcileGrants};
use crate::leave::grant_ledger::{GrantFields, GrantSummary};
use crate::leave::workflow::LeaveDayInput;
use crate::model::holiday::Holiday;
use crate::model::leave_balance::{BalanceView, LedgerTotals, UserLeaveBalance};
use crate::model::leave_request::{LeaveRequest, LeaveRequestDetail, LeaveStatus};
use crate::model::leave_type::{LeaveKind, LeaveType};
use crate::model::substitute_grant::SubstituteLeaveGrant;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Leave API",
        version = "1.0.0",
        description = r#"
## Leave Management

Leave requests, leave balances and the substitute leave ledger of the HRM system.

### 🔹 Key Features
- **Leave requests**
  - Submit multi-day or hourly requests, approve/reject them, view history
- **Balances**
  - Per leave type balances for the current fiscal year
- **Substitute leave**
  - Days earned by working on off-days, consumed soonest-expiry first
- **Holidays**
  - Public holiday calendar per year

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication**.
Grant management and approvals are restricted to **Admin** and **HR**.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::list_balances,
        crate::api::leave_type::list_holidays,

        crate::api::leave_request::create_leave_request,
        crate::api::leave_request::my_leave_requests,
        crate::api::leave_request::list_leave_requests,
        crate::api::leave_request::get_leave_request,
        crate::api::leave_request::approve_leave_request,
        crate::api::leave_request::reject_leave_request,

        crate::api::substitute_grant::list_grants,
        crate::api::substitute_grant::grant_summary,
        crate::api::substitute_grant::create_grant,
        crate::api::substitute_grant::update_grant,
        crate::api::substitute_grant::delete_grant,
        crate::api::substitute_grant::reconcile_grants
    ),
    components(
        schemas(
            LeaveType,
            LeaveKind,
            UserLeaveBalance,
            BalanceView,
            Holiday,
            LeaveStatus,
            LeaveRequest,
            LeaveRequestDetail,
            LeaveDayInput,
            CreateLeaveRequest,
            RejectLeaveRequest,
            LeaveRequestQuery,
            LeaveRequestListResponse,
            UserQuery,
            HolidayQuery,
            SubstituteLeaveGrant,
            GrantFields,
            GrantSummary,
            LedgerTotals,
            CreateGrant,
            ReconcileGrants
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request and balance APIs"),
        (name = "Substitute leave", description = "Substitute leave grant APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
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
