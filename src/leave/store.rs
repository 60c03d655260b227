//! Repository seams of the leave engine.
//!
//! Every service operation opens one [`LeaveTx`] through [`LeaveStore::begin`] and either
//! commits it or drops it, which rolls back everything written through it.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::LeaveError;
use crate::model::holiday::Holiday;
use crate::model::leave_balance::UserLeaveBalance;
use crate::model::leave_request::{
    LeaveRequest, LeaveRequestFilter, NewLeaveRequest, StatusChange,
};
use crate::model::leave_type::LeaveType;
use crate::model::substitute_grant::{NewSubstituteLeaveGrant, SubstituteLeaveGrant};

#[async_trait]
pub trait LeaveTypeRepository: Send {
    /// Active leave types in display order.
    async fn active_leave_types(&mut self) -> Result<Vec<LeaveType>, LeaveError>;

    async fn leave_type_by_id(&mut self, id: u64) -> Result<Option<LeaveType>, LeaveError>;

    async fn leave_type_by_code(&mut self, code: &str) -> Result<Option<LeaveType>, LeaveError>;
}

#[async_trait]
pub trait BalanceRepository: Send {
    /// Current balance row, locked for the rest of the transaction.
    async fn balance(
        &mut self,
        user_id: u64,
        leave_type_id: u64,
    ) -> Result<Option<UserLeaveBalance>, LeaveError>;

    async fn balances_for_user(&mut self, user_id: u64)
    -> Result<Vec<UserLeaveBalance>, LeaveError>;

    async fn save_balance(&mut self, balance: &UserLeaveBalance) -> Result<(), LeaveError>;
}

#[async_trait]
pub trait LeaveRequestRepository: Send {
    /// Which of `dates` the user already holds in a request that was not rejected.
    async fn requested_dates(
        &mut self,
        user_id: u64,
        dates: &[NaiveDate],
    ) -> Result<Vec<NaiveDate>, LeaveError>;

    /// Inserts the request together with all of its details.
    async fn insert_request(&mut self, request: NewLeaveRequest)
    -> Result<LeaveRequest, LeaveError>;

    async fn request_by_id(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError>;

    /// Newest first.
    async fn requests_for_user(&mut self, user_id: u64) -> Result<Vec<LeaveRequest>, LeaveError>;

    /// One page of requests plus the total count for the filter.
    async fn list_requests(
        &mut self,
        filter: &LeaveRequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), LeaveError>;

    /// Applies `change` only while the request is still pending.
    async fn update_status(&mut self, id: u64, change: &StatusChange) -> Result<bool, LeaveError>;
}

#[async_trait]
pub trait GrantRepository: Send {
    /// All grants of a user in creation order.
    async fn grants_for_user(&mut self, user_id: u64)
    -> Result<Vec<SubstituteLeaveGrant>, LeaveError>;

    async fn grant_by_id(&mut self, id: u64) -> Result<Option<SubstituteLeaveGrant>, LeaveError>;

    async fn insert_grant(
        &mut self,
        grant: NewSubstituteLeaveGrant,
    ) -> Result<SubstituteLeaveGrant, LeaveError>;

    async fn save_grant(&mut self, grant: &SubstituteLeaveGrant) -> Result<(), LeaveError>;

    async fn delete_grant(&mut self, id: u64) -> Result<(), LeaveError>;
}

#[async_trait]
pub trait HolidayRepository: Send {
    /// Holidays in `[from, until)`.
    async fn holidays_between(
        &mut self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Holiday>, LeaveError>;
}

/// A transaction-scoped view over every leave repository.
#[async_trait]
pub trait LeaveTx:
    LeaveTypeRepository + BalanceRepository + LeaveRequestRepository + GrantRepository + HolidayRepository
{
    async fn commit(self: Box<Self>) -> Result<(), LeaveError>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, LeaveError>;
}
