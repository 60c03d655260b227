//! In-memory store used by the engine tests.
//!
//! A transaction works on a private copy of the state and publishes it on commit, so an
//! operation that fails part way leaves nothing behind.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::LeaveError;
use crate::leave::store::{
    BalanceRepository, GrantRepository, HolidayRepository, LeaveRequestRepository, LeaveStore,
    LeaveTx, LeaveTypeRepository,
};
use crate::model::holiday::Holiday;
use crate::model::leave_balance::UserLeaveBalance;
use crate::model::leave_request::{
    LeaveRequest, LeaveRequestDetail, LeaveRequestFilter, LeaveStatus, NewLeaveRequest,
    StatusChange,
};
use crate::model::leave_type::LeaveType;
use crate::model::substitute_grant::{NewSubstituteLeaveGrant, SubstituteLeaveGrant};

#[derive(Debug, Clone)]
pub struct MemoryState {
    pub leave_types: Vec<LeaveType>,
    pub balances: Vec<UserLeaveBalance>,
    pub requests: Vec<LeaveRequest>,
    pub grants: Vec<SubstituteLeaveGrant>,
    pub holidays: Vec<Holiday>,
    next_id: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            leave_types: Vec::new(),
            balances: Vec::new(),
            requests: Vec::new(),
            grants: Vec::new(),
            holidays: Vec::new(),
            next_id: 1_000,
        }
    }
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryLeaveStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLeaveStore {
    pub fn new(state: MemoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Committed state.
    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().unwrap().clone()
    }

    pub fn balance(&self, user_id: u64, leave_type_id: u64) -> UserLeaveBalance {
        self.snapshot()
            .balances
            .into_iter()
            .find(|b| b.user_id == user_id && b.leave_type_id == leave_type_id)
            .expect("balance row")
    }

    pub fn grant(&self, id: u64) -> SubstituteLeaveGrant {
        self.snapshot()
            .grants
            .into_iter()
            .find(|g| g.id == id)
            .expect("grant row")
    }

    /// Seeds a grant as if it had been created earlier; ids follow insertion order.
    pub fn seed_grant(&self, mut grant: SubstituteLeaveGrant) -> SubstituteLeaveGrant {
        let mut state = self.state.lock().unwrap();
        grant.id = state.next_id();
        state.grants.push(grant.clone());
        grant
    }
}

pub struct MemoryLeaveTx {
    staged: MemoryState,
    shared: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl LeaveStore for MemoryLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, LeaveError> {
        let staged = self.state.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(Box::new(MemoryLeaveTx {
            staged,
            shared: Arc::clone(&self.state),
        }))
    }
}

#[async_trait]
impl LeaveTx for MemoryLeaveTx {
    async fn commit(self: Box<Self>) -> Result<(), LeaveError> {
        let this = *self;
        *this.shared.lock().unwrap_or_else(|e| e.into_inner()) = this.staged;
        Ok(())
    }
}

#[async_trait]
impl LeaveTypeRepository for MemoryLeaveTx {
    async fn active_leave_types(&mut self) -> Result<Vec<LeaveType>, LeaveError> {
        let mut types: Vec<_> = self
            .staged
            .leave_types
            .iter()
            .filter(|lt| lt.is_active)
            .cloned()
            .collect();
        types.sort_by_key(|lt| lt.display_order);
        Ok(types)
    }

    async fn leave_type_by_id(&mut self, id: u64) -> Result<Option<LeaveType>, LeaveError> {
        Ok(self.staged.leave_types.iter().find(|lt| lt.id == id).cloned())
    }

    async fn leave_type_by_code(&mut self, code: &str) -> Result<Option<LeaveType>, LeaveError> {
        Ok(self
            .staged
            .leave_types
            .iter()
            .find(|lt| lt.code == code)
            .cloned())
    }
}

#[async_trait]
impl BalanceRepository for MemoryLeaveTx {
    async fn balance(
        &mut self,
        user_id: u64,
        leave_type_id: u64,
    ) -> Result<Option<UserLeaveBalance>, LeaveError> {
        Ok(self
            .staged
            .balances
            .iter()
            .filter(|b| b.user_id == user_id && b.leave_type_id == leave_type_id)
            .max_by_key(|b| b.fiscal_year)
            .cloned())
    }

    async fn balances_for_user(
        &mut self,
        user_id: u64,
    ) -> Result<Vec<UserLeaveBalance>, LeaveError> {
        Ok(self
            .staged
            .balances
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_balance(&mut self, balance: &UserLeaveBalance) -> Result<(), LeaveError> {
        let row = self
            .staged
            .balances
            .iter_mut()
            .find(|b| b.id == balance.id)
            .ok_or(LeaveError::Store {
                context: "update leave balance",
                source: sqlx::Error::RowNotFound,
            })?;
        *row = balance.clone();
        Ok(())
    }
}

#[async_trait]
impl LeaveRequestRepository for MemoryLeaveTx {
    async fn requested_dates(
        &mut self,
        user_id: u64,
        dates: &[NaiveDate],
    ) -> Result<Vec<NaiveDate>, LeaveError> {
        let mut taken: Vec<NaiveDate> = self
            .staged
            .requests
            .iter()
            .filter(|r| r.user_id == user_id && r.status != LeaveStatus::Rejected)
            .flat_map(|r| r.details.iter().map(|d| d.leave_date))
            .filter(|d| dates.contains(d))
            .collect();
        taken.sort();
        taken.dedup();
        Ok(taken)
    }

    async fn insert_request(
        &mut self,
        request: NewLeaveRequest,
    ) -> Result<LeaveRequest, LeaveError> {
        let id = self.staged.next_id();
        let details = request
            .details
            .into_iter()
            .map(|d| LeaveRequestDetail {
                id: self.staged.next_id(),
                leave_date: d.leave_date,
                start_time: d.start_time,
                end_time: d.end_time,
                day_value: d.day_value,
            })
            .collect();

        let created = LeaveRequest {
            id,
            user_id: request.user_id,
            leave_type_id: request.leave_type_id,
            leave_type_name: request.leave_type_name,
            request_date: request.request_date,
            is_hourly_based: request.is_hourly_based,
            reason: request.reason,
            total_days: request.total_days,
            status: LeaveStatus::Pending,
            approver_id: None,
            processed_at: None,
            rejection_reason: None,
            created_at: request.created_at,
            details,
        };
        self.staged.requests.push(created.clone());
        Ok(created)
    }

    async fn request_by_id(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        Ok(self.staged.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn requests_for_user(&mut self, user_id: u64) -> Result<Vec<LeaveRequest>, LeaveError> {
        let mut requests: Vec<_> = self
            .staged
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn list_requests(
        &mut self,
        filter: &LeaveRequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), LeaveError> {
        let mut matching: Vec<_> = self
            .staged
            .requests
            .iter()
            .filter(|r| filter.user_id.is_none_or(|u| r.user_id == u))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_status(&mut self, id: u64, change: &StatusChange) -> Result<bool, LeaveError> {
        match self
            .staged
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.status == LeaveStatus::Pending)
        {
            Some(request) => {
                request.status = change.status;
                request.approver_id = Some(change.approver_id);
                request.processed_at = Some(change.processed_at);
                request.rejection_reason = change.rejection_reason.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl GrantRepository for MemoryLeaveTx {
    async fn grants_for_user(
        &mut self,
        user_id: u64,
    ) -> Result<Vec<SubstituteLeaveGrant>, LeaveError> {
        Ok(self
            .staged
            .grants
            .iter()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn grant_by_id(&mut self, id: u64) -> Result<Option<SubstituteLeaveGrant>, LeaveError> {
        Ok(self.staged.grants.iter().find(|g| g.id == id).cloned())
    }

    async fn insert_grant(
        &mut self,
        grant: NewSubstituteLeaveGrant,
    ) -> Result<SubstituteLeaveGrant, LeaveError> {
        let created = SubstituteLeaveGrant {
            id: self.staged.next_id(),
            user_id: grant.user_id,
            grant_date: grant.grant_date,
            work_date: grant.work_date,
            granted_days: grant.granted_days,
            used_days: 0.0,
            remaining_days: grant.granted_days,
            expire_date: grant.expire_date,
            reason: grant.reason,
            is_expired: false,
            created_at: grant.created_at,
            updated_at: grant.created_at,
        };
        self.staged.grants.push(created.clone());
        Ok(created)
    }

    async fn save_grant(&mut self, grant: &SubstituteLeaveGrant) -> Result<(), LeaveError> {
        let row = self
            .staged
            .grants
            .iter_mut()
            .find(|g| g.id == grant.id)
            .ok_or(LeaveError::Store {
                context: "update substitute leave grant",
                source: sqlx::Error::RowNotFound,
            })?;
        *row = grant.clone();
        Ok(())
    }

    async fn delete_grant(&mut self, id: u64) -> Result<(), LeaveError> {
        self.staged.grants.retain(|g| g.id != id);
        Ok(())
    }
}

#[async_trait]
impl HolidayRepository for MemoryLeaveTx {
    async fn holidays_between(
        &mut self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Holiday>, LeaveError> {
        let mut holidays: Vec<_> = self
            .staged
            .holidays
            .iter()
            .filter(|h| h.holiday_date >= from && h.holiday_date < until)
            .cloned()
            .collect();
        holidays.sort_by_key(|h| h.holiday_date);
        Ok(holidays)
    }
}
