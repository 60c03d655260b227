//! MySQL backed leave store.
//!
//! Balance and grant reads take row locks (`FOR UPDATE`) so concurrent processes serialize
//! on the same user's ledger until the transaction ends.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySql, MySqlConnection, MySqlPool, Transaction};

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

const LEAVE_TYPE_COLUMNS: &str = "id, code, name, description, default_days, \
    is_hourly_available, reason_required, gender_specific, display_order, is_active";

const BALANCE_COLUMNS: &str = "id, user_id, leave_type_id, fiscal_year, total_days, \
    used_days, remaining_days, expire_date, updated_at";

const GRANT_COLUMNS: &str = "id, user_id, grant_date, work_date, granted_days, used_days, \
    remaining_days, expire_date, reason, is_expired, created_at, updated_at";

const REQUEST_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.leave_type_id, lt.name AS leave_type_name, r.request_date,
           r.is_hourly_based, r.reason, r.total_days, r.status, r.approver_id,
           r.processed_at, r.rejection_reason, r.created_at
    FROM leave_requests r
    JOIN leave_types lt ON lt.id = r.leave_type_id
"#;

#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn begin(&self) -> Result<Box<dyn LeaveTx>, LeaveError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(LeaveError::store("begin transaction"))?;
        Ok(Box::new(MySqlLeaveTx { tx }))
    }
}

/// Open MySQL transaction. Dropping it without [`LeaveTx::commit`] rolls back.
pub struct MySqlLeaveTx {
    tx: Transaction<'static, MySql>,
}

impl MySqlLeaveTx {
    fn conn(&mut self) -> &mut MySqlConnection {
        &mut self.tx
    }
}

#[async_trait]
impl LeaveTx for MySqlLeaveTx {
    async fn commit(self: Box<Self>) -> Result<(), LeaveError> {
        self.tx
            .commit()
            .await
            .map_err(LeaveError::store("commit transaction"))
    }
}

/* =========================
Row mapping
========================= */

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    user_id: u64,
    leave_type_id: u64,
    leave_type_name: String,
    request_date: NaiveDate,
    is_hourly_based: bool,
    reason: String,
    total_days: f64,
    status: String,
    approver_id: Option<u64>,
    processed_at: Option<NaiveDateTime>,
    rejection_reason: Option<String>,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct LeaveRequestDetailRow {
    id: u64,
    leave_request_id: u64,
    leave_date: NaiveDate,
    start_time: Option<String>,
    end_time: Option<String>,
    day_value: f64,
}

impl LeaveRequestRow {
    fn into_request(self, details: Vec<LeaveRequestDetail>) -> Result<LeaveRequest, LeaveError> {
        let status = LeaveStatus::from_str(&self.status).map_err(|e| LeaveError::Store {
            context: "decode leave request status",
            source: sqlx::Error::Decode(Box::new(e)),
        })?;

        Ok(LeaveRequest {
            id: self.id,
            user_id: self.user_id,
            leave_type_id: self.leave_type_id,
            leave_type_name: self.leave_type_name,
            request_date: self.request_date,
            is_hourly_based: self.is_hourly_based,
            reason: self.reason,
            total_days: self.total_days,
            status,
            approver_id: self.approver_id,
            processed_at: self.processed_at,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            details,
        })
    }
}

/// WHERE clause for a request listing plus the owned status parameter, bound after the
/// user id when both are present.
fn filter_clause(filter: &LeaveRequestFilter) -> (String, Option<String>) {
    let mut where_sql = String::from(" WHERE 1=1");
    if filter.user_id.is_some() {
        where_sql.push_str(" AND r.user_id = ?");
    }
    let status = filter.status.map(|status| status.to_string());
    if status.is_some() {
        where_sql.push_str(" AND r.status = ?");
    }
    (where_sql, status)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Loads the details of `rows` in one query and assembles the requests, keeping row order.
async fn with_details(
    conn: &mut MySqlConnection,
    rows: Vec<LeaveRequestRow>,
) -> Result<Vec<LeaveRequest>, LeaveError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        r#"
        SELECT id, leave_request_id, leave_date, start_time, end_time, day_value
        FROM leave_request_details
        WHERE leave_request_id IN ({})
        ORDER BY leave_date, id
        "#,
        placeholders(rows.len())
    );
    let mut query = sqlx::query_as::<_, LeaveRequestDetailRow>(&sql);
    for row in &rows {
        query = query.bind(row.id);
    }
    let detail_rows = query
        .fetch_all(&mut *conn)
        .await
        .map_err(LeaveError::store("fetch leave request details"))?;

    let mut by_request: HashMap<u64, Vec<LeaveRequestDetail>> = HashMap::new();
    for d in detail_rows {
        by_request
            .entry(d.leave_request_id)
            .or_default()
            .push(LeaveRequestDetail {
                id: d.id,
                leave_date: d.leave_date,
                start_time: d.start_time,
                end_time: d.end_time,
                day_value: d.day_value,
            });
    }

    rows.into_iter()
        .map(|row| {
            let details = by_request.remove(&row.id).unwrap_or_default();
            row.into_request(details)
        })
        .collect()
}

/* =========================
Leave types
========================= */

#[async_trait]
impl LeaveTypeRepository for MySqlLeaveTx {
    async fn active_leave_types(&mut self) -> Result<Vec<LeaveType>, LeaveError> {
        let sql = format!(
            "SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types WHERE is_active = TRUE ORDER BY display_order, id"
        );
        sqlx::query_as::<_, LeaveType>(&sql)
            .fetch_all(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave types"))
    }

    async fn leave_type_by_id(&mut self, id: u64) -> Result<Option<LeaveType>, LeaveError> {
        let sql = format!("SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types WHERE id = ?");
        sqlx::query_as::<_, LeaveType>(&sql)
            .bind(id)
            .fetch_optional(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave type"))
    }

    async fn leave_type_by_code(&mut self, code: &str) -> Result<Option<LeaveType>, LeaveError> {
        let sql = format!("SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types WHERE code = ?");
        sqlx::query_as::<_, LeaveType>(&sql)
            .bind(code)
            .fetch_optional(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave type by code"))
    }
}

/* =========================
Balances
========================= */

#[async_trait]
impl BalanceRepository for MySqlLeaveTx {
    async fn balance(
        &mut self,
        user_id: u64,
        leave_type_id: u64,
    ) -> Result<Option<UserLeaveBalance>, LeaveError> {
        let sql = format!(
            r#"
            SELECT {BALANCE_COLUMNS}
            FROM user_leave_balances
            WHERE user_id = ? AND leave_type_id = ?
            ORDER BY fiscal_year DESC
            LIMIT 1
            FOR UPDATE
            "#
        );
        sqlx::query_as::<_, UserLeaveBalance>(&sql)
            .bind(user_id)
            .bind(leave_type_id)
            .fetch_optional(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave balance"))
    }

    async fn balances_for_user(
        &mut self,
        user_id: u64,
    ) -> Result<Vec<UserLeaveBalance>, LeaveError> {
        let sql = format!(
            "SELECT {BALANCE_COLUMNS} FROM user_leave_balances WHERE user_id = ? ORDER BY fiscal_year DESC, leave_type_id"
        );
        sqlx::query_as::<_, UserLeaveBalance>(&sql)
            .bind(user_id)
            .fetch_all(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave balances"))
    }

    async fn save_balance(&mut self, balance: &UserLeaveBalance) -> Result<(), LeaveError> {
        sqlx::query(
            r#"
            UPDATE user_leave_balances
            SET total_days = ?, used_days = ?, remaining_days = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(balance.total_days)
        .bind(balance.used_days)
        .bind(balance.remaining_days)
        .bind(balance.updated_at)
        .bind(balance.id)
        .execute(self.conn())
        .await
        .map_err(LeaveError::store("update leave balance"))?;
        Ok(())
    }
}

/* =========================
Leave requests
========================= */

#[async_trait]
impl LeaveRequestRepository for MySqlLeaveTx {
    async fn requested_dates(
        &mut self,
        user_id: u64,
        dates: &[NaiveDate],
    ) -> Result<Vec<NaiveDate>, LeaveError> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT DISTINCT d.leave_date
            FROM leave_request_details d
            JOIN leave_requests r ON r.id = d.leave_request_id
            WHERE r.user_id = ?
              AND r.status <> ?
              AND d.leave_date IN ({})
            ORDER BY d.leave_date
            "#,
            placeholders(dates.len())
        );
        let mut query = sqlx::query_scalar::<_, NaiveDate>(&sql)
            .bind(user_id)
            .bind(LeaveStatus::Rejected.as_ref());
        for date in dates {
            query = query.bind(*date);
        }
        query
            .fetch_all(self.conn())
            .await
            .map_err(LeaveError::store("check requested leave dates"))
    }

    async fn insert_request(
        &mut self,
        request: NewLeaveRequest,
    ) -> Result<LeaveRequest, LeaveError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, leave_type_id, request_date, is_hourly_based, reason,
                 total_days, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.user_id)
        .bind(request.leave_type_id)
        .bind(request.request_date)
        .bind(request.is_hourly_based)
        .bind(&request.reason)
        .bind(request.total_days)
        .bind(LeaveStatus::Pending.as_ref())
        .bind(request.created_at)
        .execute(self.conn())
        .await
        .map_err(LeaveError::store("insert leave request"))?;
        let id = result.last_insert_id();

        let mut details = Vec::with_capacity(request.details.len());
        for d in request.details {
            let result = sqlx::query(
                r#"
                INSERT INTO leave_request_details
                    (leave_request_id, leave_date, start_time, end_time, day_value)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(d.leave_date)
            .bind(&d.start_time)
            .bind(&d.end_time)
            .bind(d.day_value)
            .execute(self.conn())
            .await
            .map_err(LeaveError::store("insert leave request detail"))?;

            details.push(LeaveRequestDetail {
                id: result.last_insert_id(),
                leave_date: d.leave_date,
                start_time: d.start_time,
                end_time: d.end_time,
                day_value: d.day_value,
            });
        }

        Ok(LeaveRequest {
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
        })
    }

    async fn request_by_id(&mut self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        let sql = format!("{REQUEST_SELECT} WHERE r.id = ?");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave request"))?;

        match row {
            Some(row) => Ok(with_details(self.conn(), vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn requests_for_user(&mut self, user_id: u64) -> Result<Vec<LeaveRequest>, LeaveError> {
        let sql = format!("{REQUEST_SELECT} WHERE r.user_id = ? ORDER BY r.created_at DESC, r.id DESC");
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(user_id)
            .fetch_all(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave requests"))?;
        with_details(self.conn(), rows).await
    }

    async fn list_requests(
        &mut self,
        filter: &LeaveRequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), LeaveError> {
        let (where_sql, status) = filter_clause(filter);

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests r{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(user_id) = filter.user_id {
            count_q = count_q.bind(user_id);
        }
        if let Some(status) = &status {
            count_q = count_q.bind(status.clone());
        }
        let total = count_q
            .fetch_one(self.conn())
            .await
            .map_err(LeaveError::store("count leave requests"))?;

        let data_sql = format!(
            "{REQUEST_SELECT}{where_sql} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, LeaveRequestRow>(&data_sql);
        if let Some(user_id) = filter.user_id {
            data_q = data_q.bind(user_id);
        }
        if let Some(status) = &status {
            data_q = data_q.bind(status.clone());
        }
        let rows = data_q
            .bind(filter.per_page)
            .bind(filter.offset())
            .fetch_all(self.conn())
            .await
            .map_err(LeaveError::store("fetch leave request page"))?;

        Ok((with_details(self.conn(), rows).await?, total))
    }

    async fn update_status(&mut self, id: u64, change: &StatusChange) -> Result<bool, LeaveError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approver_id = ?, processed_at = ?, rejection_reason = ?
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(change.status.as_ref())
        .bind(change.approver_id)
        .bind(change.processed_at)
        .bind(&change.rejection_reason)
        .bind(id)
        .bind(LeaveStatus::Pending.as_ref())
        .execute(self.conn())
        .await
        .map_err(LeaveError::store("update leave request status"))?;

        Ok(result.rows_affected() > 0)
    }
}

/* =========================
Substitute grants
========================= */

#[async_trait]
impl GrantRepository for MySqlLeaveTx {
    async fn grants_for_user(
        &mut self,
        user_id: u64,
    ) -> Result<Vec<SubstituteLeaveGrant>, LeaveError> {
        let sql = format!(
            "SELECT {GRANT_COLUMNS} FROM substitute_leave_grants WHERE user_id = ? ORDER BY id FOR UPDATE"
        );
        sqlx::query_as::<_, SubstituteLeaveGrant>(&sql)
            .bind(user_id)
            .fetch_all(self.conn())
            .await
            .map_err(LeaveError::store("fetch substitute leave grants"))
    }

    async fn grant_by_id(&mut self, id: u64) -> Result<Option<SubstituteLeaveGrant>, LeaveError> {
        let sql =
            format!("SELECT {GRANT_COLUMNS} FROM substitute_leave_grants WHERE id = ? FOR UPDATE");
        sqlx::query_as::<_, SubstituteLeaveGrant>(&sql)
            .bind(id)
            .fetch_optional(self.conn())
            .await
            .map_err(LeaveError::store("fetch substitute leave grant"))
    }

    async fn insert_grant(
        &mut self,
        grant: NewSubstituteLeaveGrant,
    ) -> Result<SubstituteLeaveGrant, LeaveError> {
        let result = sqlx::query(
            r#"
            INSERT INTO substitute_leave_grants
                (user_id, grant_date, work_date, granted_days, used_days, remaining_days,
                 expire_date, reason, is_expired, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?, ?, FALSE, ?, ?)
            "#,
        )
        .bind(grant.user_id)
        .bind(grant.grant_date)
        .bind(grant.work_date)
        .bind(grant.granted_days)
        .bind(grant.granted_days)
        .bind(grant.expire_date)
        .bind(&grant.reason)
        .bind(grant.created_at)
        .bind(grant.created_at)
        .execute(self.conn())
        .await
        .map_err(LeaveError::store("insert substitute leave grant"))?;

        Ok(SubstituteLeaveGrant {
            id: result.last_insert_id(),
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
        })
    }

    async fn save_grant(&mut self, grant: &SubstituteLeaveGrant) -> Result<(), LeaveError> {
        sqlx::query(
            r#"
            UPDATE substitute_leave_grants
            SET grant_date = ?, work_date = ?, granted_days = ?, used_days = ?,
                remaining_days = ?, expire_date = ?, reason = ?, is_expired = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(grant.grant_date)
        .bind(grant.work_date)
        .bind(grant.granted_days)
        .bind(grant.used_days)
        .bind(grant.remaining_days)
        .bind(grant.expire_date)
        .bind(&grant.reason)
        .bind(grant.is_expired)
        .bind(grant.updated_at)
        .bind(grant.id)
        .execute(self.conn())
        .await
        .map_err(LeaveError::store("update substitute leave grant"))?;
        Ok(())
    }

    async fn delete_grant(&mut self, id: u64) -> Result<(), LeaveError> {
        sqlx::query("DELETE FROM substitute_leave_grants WHERE id = ?")
            .bind(id)
            .execute(self.conn())
            .await
            .map_err(LeaveError::store("delete substitute leave grant"))?;
        Ok(())
    }
}

/* =========================
Holidays
========================= */

#[async_trait]
impl HolidayRepository for MySqlLeaveTx {
    async fn holidays_between(
        &mut self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Holiday>, LeaveError> {
        sqlx::query_as::<_, Holiday>(
            r#"
            SELECT holiday_date, holiday_name, holiday_type
            FROM holidays
            WHERE holiday_date >= ? AND holiday_date < ?
            ORDER BY holiday_date
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(self.conn())
        .await
        .map_err(LeaveError::store("fetch holidays"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn test_filter_clause() {
        let (where_sql, status) = filter_clause(&LeaveRequestFilter::new(None, None, None, None));
        assert_eq!(where_sql, " WHERE 1=1");
        assert!(status.is_none());

        let filter = LeaveRequestFilter::new(Some(1000), Some(LeaveStatus::Pending), None, None);
        let (where_sql, status) = filter_clause(&filter);
        assert_eq!(where_sql, " WHERE 1=1 AND r.user_id = ? AND r.status = ?");
        assert_eq!(status.as_deref(), Some("pending"));
    }
}
