//! Leave request creation and the pending -> approved/rejected transitions.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::leave::grant_ledger::allocate;
use crate::leave::service::LeaveService;
use crate::model::leave_request::{
    LeaveRequest, LeaveRequestFilter, LeaveStatus, NewLeaveRequest, NewLeaveRequestDetail,
    StatusChange,
};
use crate::model::leave_type::LeaveKind;
use crate::utils::date::{format_date, parse_date_part};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeaveDayInput {
    /// `YYYY-MM-DD`, any time-of-day suffix is ignored
    #[schema(example = "2026-01-05")]
    pub leave_date: String,
    #[schema(example = "09:00", nullable = true)]
    pub start_time: Option<String>,
    #[schema(example = "13:00", nullable = true)]
    pub end_time: Option<String>,
    #[schema(example = 1.0)]
    pub day_value: f64,
}

impl LeaveDayInput {
    fn is_hourly(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CreateLeaveRequestInput {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub is_hourly_based: bool,
    pub reason: String,
    pub total_days: f64,
    pub days: Vec<LeaveDayInput>,
}

/// Parses the submitted dates, rejecting the first calendar date that appears twice.
fn collect_leave_days(days: &[LeaveDayInput]) -> Result<Vec<NewLeaveRequestDetail>, LeaveError> {
    let mut seen = HashSet::with_capacity(days.len());
    let mut details = Vec::with_capacity(days.len());

    for day in days {
        let leave_date = parse_date_part("leave_date", &day.leave_date)?;
        if !seen.insert(leave_date) {
            return Err(LeaveError::validation(format!(
                "duplicate leave date: {}",
                format_date(leave_date)
            )));
        }
        details.push(NewLeaveRequestDetail {
            leave_date,
            start_time: day.start_time.clone(),
            end_time: day.end_time.clone(),
            day_value: day.day_value,
        });
    }
    Ok(details)
}

impl LeaveService {
    #[instrument(
        skip(self, input),
        fields(
            user_id = input.user_id,
            leave_type_id = input.leave_type_id,
            total_days = input.total_days,
            days = input.days.len()
        )
    )]
    pub async fn create_leave_request(
        &self,
        input: CreateLeaveRequestInput,
    ) -> Result<LeaveRequest, LeaveError> {
        let _guard = self.locks.acquire(input.user_id, input.leave_type_id).await;
        let mut tx = self.store.begin().await?;

        // 1. leave type
        let leave_type = self.catalog.by_id(&mut *tx, input.leave_type_id).await?;

        // 2. reason
        if leave_type.reason_required && input.reason.trim().is_empty() {
            warn!(leave_type = %leave_type.code, "Reason missing for a leave type that requires one");
            return Err(LeaveError::validation("reason required"));
        }

        // 3. hourly segments
        let hourly = input.is_hourly_based || input.days.iter().any(LeaveDayInput::is_hourly);
        if hourly && !leave_type.is_hourly_available {
            warn!(leave_type = %leave_type.code, "Hourly leave requested for a daily-only leave type");
            return Err(LeaveError::validation("hourly not allowed"));
        }

        if !input.total_days.is_finite() || input.total_days <= 0.0 {
            return Err(LeaveError::validation("total days must be greater than zero"));
        }

        // 4. balance
        let mut balance = tx
            .balance(input.user_id, input.leave_type_id)
            .await?
            .ok_or_else(|| {
                LeaveError::not_found(format!(
                    "leave balance for user {} and leave type {}",
                    input.user_id, input.leave_type_id
                ))
            })?;

        // 5. sufficient remaining days
        if input.total_days > balance.remaining_days {
            warn!(
                requested_days = input.total_days,
                remaining_days = balance.remaining_days,
                "Leave balance exceeded"
            );
            return Err(LeaveError::InsufficientBalance {
                remaining: balance.remaining_days,
            });
        }

        // 6. duplicates inside the submission
        let details = collect_leave_days(&input.days)
            .inspect_err(|e| warn!(error = %e, "Invalid leave dates"))?;

        // 7. dates already held by another request
        let dates: Vec<NaiveDate> = details.iter().map(|d| d.leave_date).collect();
        let mut taken = tx.requested_dates(input.user_id, &dates).await?;
        if !taken.is_empty() {
            taken.sort();
            let taken = taken.into_iter().map(format_date).collect::<Vec<_>>().join(", ");
            warn!(taken_dates = %taken, "Leave already requested for some dates");
            return Err(LeaveError::validation(format!(
                "leave already requested for: {taken}"
            )));
        }

        // 8.
        if details.is_empty() {
            warn!("Leave request without any dates");
            return Err(LeaveError::validation("no valid dates"));
        }

        // 9. persist request, consume balance, draw grants for substitute leave
        let now = self.clock.now();
        let request = tx
            .insert_request(NewLeaveRequest {
                user_id: input.user_id,
                leave_type_id: leave_type.id,
                leave_type_name: leave_type.name.clone(),
                request_date: now.date(),
                is_hourly_based: hourly,
                reason: input.reason.trim().to_string(),
                total_days: input.total_days,
                created_at: now,
                details,
            })
            .await?;

        balance.consume(input.total_days, now);
        tx.save_balance(&balance).await?;

        if leave_type.kind == LeaveKind::Substitute {
            let substitute = self.catalog.require_substitute()?;
            allocate(&mut *tx, substitute, input.user_id, input.total_days, now).await?;
        }

        tx.commit().await?;

        info!(
            request_id = request.id,
            leave_type = %leave_type.name,
            "Leave request created"
        );
        Ok(request)
    }

    pub async fn get_request(&self, request_id: u64) -> Result<LeaveRequest, LeaveError> {
        let mut tx = self.store.begin().await?;
        tx.request_by_id(request_id)
            .await?
            .ok_or_else(|| LeaveError::not_found(format!("leave request {request_id}")))
    }

    pub async fn list_requests_for_user(&self, user_id: u64) -> Result<Vec<LeaveRequest>, LeaveError> {
        let mut tx = self.store.begin().await?;
        tx.requests_for_user(user_id).await
    }

    pub async fn list_requests(
        &self,
        filter: &LeaveRequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), LeaveError> {
        let mut tx = self.store.begin().await?;
        tx.list_requests(filter).await
    }

    #[instrument(skip(self))]
    pub async fn approve_request(
        &self,
        request_id: u64,
        approver_id: u64,
    ) -> Result<LeaveRequest, LeaveError> {
        self.process_request(request_id, approver_id, LeaveStatus::Approved, None)
            .await
    }

    /// Rejection does not give the days back to the balance.
    #[instrument(skip(self, reason))]
    pub async fn reject_request(
        &self,
        request_id: u64,
        approver_id: u64,
        reason: Option<String>,
    ) -> Result<LeaveRequest, LeaveError> {
        self.process_request(request_id, approver_id, LeaveStatus::Rejected, reason)
            .await
    }

    async fn process_request(
        &self,
        request_id: u64,
        approver_id: u64,
        status: LeaveStatus,
        rejection_reason: Option<String>,
    ) -> Result<LeaveRequest, LeaveError> {
        let mut tx = self.store.begin().await?;

        let current = tx
            .request_by_id(request_id)
            .await?
            .ok_or_else(|| LeaveError::not_found(format!("leave request {request_id}")))?;
        if current.status != LeaveStatus::Pending {
            warn!(request_id, status = %current.status, "Leave request already processed");
            return Err(LeaveError::AlreadyProcessed(request_id));
        }

        let change = StatusChange {
            status,
            approver_id,
            processed_at: self.clock.now(),
            rejection_reason,
        };
        if !tx.update_status(request_id, &change).await? {
            return Err(LeaveError::AlreadyProcessed(request_id));
        }

        let updated = tx
            .request_by_id(request_id)
            .await?
            .ok_or_else(|| LeaveError::not_found(format!("leave request {request_id}")))?;
        tx.commit().await?;

        info!(request_id, %status, "Leave request processed");
        Ok(updated)
    }
}
