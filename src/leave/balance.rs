//! Keeping the substitute balance row in step with the grant ledger.
//!
//! Only the substitute leave type goes through here; every other type treats its balance
//! row as the sole source of truth.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::error::LeaveError;
use crate::leave::catalog::SubstituteLeaveType;
use crate::leave::store::LeaveTx;
use crate::model::leave_balance::{LedgerTotals, UserLeaveBalance};
use crate::model::substitute_grant::live_totals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reconcile {
    /// After drawing days: `remaining` follows the ledger, `total` is left alone.
    Usage,
    /// After a grant changed: the whole row is rebuilt from the ledger.
    Ledger,
}

pub(crate) async fn ledger_totals(
    tx: &mut dyn LeaveTx,
    user_id: u64,
) -> Result<LedgerTotals, LeaveError> {
    let grants = tx.grants_for_user(user_id).await?;
    Ok(live_totals(&grants))
}

pub(crate) async fn reconcile_balance(
    tx: &mut dyn LeaveTx,
    substitute: &SubstituteLeaveType,
    user_id: u64,
    mode: Reconcile,
    now: NaiveDateTime,
) -> Result<UserLeaveBalance, LeaveError> {
    let totals = ledger_totals(tx, user_id).await?;

    let mut balance = tx.balance(user_id, substitute.id).await?.ok_or_else(|| {
        LeaveError::not_found(format!("substitute leave balance for user {user_id}"))
    })?;

    match mode {
        Reconcile::Usage => balance.sync_remaining(totals.remaining_days, now),
        Reconcile::Ledger => balance.sync_with_ledger(totals, now),
    }
    if !balance.is_consistent() {
        warn!(user_id, ?balance, "Substitute balance does not add up after reconciliation");
    }
    tx.save_balance(&balance).await?;

    debug!(
        user_id,
        total_days = balance.total_days,
        used_days = balance.used_days,
        remaining_days = balance.remaining_days,
        ?mode,
        "Substitute balance reconciled"
    );
    Ok(balance)
}
