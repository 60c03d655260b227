use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per user, per leave type, per fiscal year summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserLeaveBalance {
    pub id: u64,
    pub user_id: u64,
    pub leave_type_id: u64,
    #[schema(example = 2026)]
    pub fiscal_year: i32,
    #[schema(example = 10.0)]
    pub total_days: f64,
    #[schema(example = 2.5)]
    pub used_days: f64,
    #[schema(example = 7.5)]
    pub remaining_days: f64,
    #[schema(value_type = Option<String>, format = "date")]
    pub expire_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

/// Live totals over a user's substitute grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct LedgerTotals {
    pub granted_days: f64,
    pub used_days: f64,
    pub remaining_days: f64,
}

impl UserLeaveBalance {
    pub fn consume(&mut self, days: f64, now: NaiveDateTime) {
        self.used_days += days;
        self.remaining_days = self.total_days - self.used_days;
        self.updated_at = now;
    }

    /// Takes `remaining` from the ledger and keeps `total` as is.
    pub fn sync_remaining(&mut self, remaining: f64, now: NaiveDateTime) {
        self.remaining_days = remaining;
        self.used_days = self.total_days - remaining;
        self.updated_at = now;
    }

    /// Rebuilds the row from the ledger totals.
    pub fn sync_with_ledger(&mut self, totals: LedgerTotals, now: NaiveDateTime) {
        self.total_days = totals.granted_days;
        self.remaining_days = totals.remaining_days;
        self.used_days = self.total_days - self.remaining_days;
        self.updated_at = now;
    }

    pub fn is_consistent(&self) -> bool {
        (self.remaining_days - (self.total_days - self.used_days)).abs() < 1e-9
    }
}

/// A balance row with the display name of its leave type.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceView {
    #[serde(flatten)]
    pub balance: UserLeaveBalance,
    pub leave_type_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(total: f64, used: f64) -> UserLeaveBalance {
        UserLeaveBalance {
            id: 1,
            user_id: 7,
            leave_type_id: 1,
            fiscal_year: 2026,
            total_days: total,
            used_days: used,
            remaining_days: total - used,
            expire_date: None,
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_consume_keeps_invariant() {
        let mut b = balance(10.0, 1.0);
        b.consume(2.5, NaiveDateTime::default());
        assert_eq!(b.used_days, 3.5);
        assert_eq!(b.remaining_days, 6.5);
        assert!(b.is_consistent());
    }

    #[test]
    fn test_sync_remaining_keeps_total() {
        let mut b = balance(3.0, 0.0);
        b.sync_remaining(1.0, NaiveDateTime::default());
        assert_eq!(b.total_days, 3.0);
        assert_eq!(b.used_days, 2.0);
        assert!(b.is_consistent());
    }

    #[test]
    fn test_sync_with_ledger_rebuilds_row() {
        let mut b = balance(0.0, 0.0);
        let totals = LedgerTotals {
            granted_days: 4.0,
            used_days: 1.5,
            remaining_days: 2.5,
        };
        b.sync_with_ledger(totals, NaiveDateTime::default());
        assert_eq!(b.total_days, 4.0);
        assert_eq!(b.used_days, 1.5);
        assert_eq!(b.remaining_days, 2.5);
    }
}
