//! Substitute leave grants: lifecycle, expiry and the draw-down allocation.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::LeaveError;
use crate::leave::balance::{Reconcile, reconcile_balance};
use crate::leave::catalog::SubstituteLeaveType;
use crate::leave::notify::notify_quietly;
use crate::leave::service::LeaveService;
use crate::leave::store::LeaveTx;
use crate::model::leave_balance::LedgerTotals;
use crate::model::substitute_grant::{NewSubstituteLeaveGrant, SubstituteLeaveGrant, live_totals};
use crate::utils::date::parse_date;

/// Residue below this is treated as fully allocated.
const DAY_EPSILON: f64 = 1e-9;

/// Editable fields of a grant, dates as `YYYY-MM-DD`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct GrantFields {
    #[schema(example = "2026-01-10")]
    pub grant_date: String,
    #[schema(example = "2026-01-04")]
    pub work_date: String,
    #[schema(example = 1.0)]
    pub granted_days: f64,
    #[schema(example = "2026-07-10")]
    pub expire_date: String,
    #[serde(default)]
    #[schema(example = "Weekend release support")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
struct ParsedGrant {
    grant_date: NaiveDate,
    work_date: NaiveDate,
    expire_date: NaiveDate,
    granted_days: f64,
    reason: String,
}

impl GrantFields {
    fn parse(&self) -> Result<ParsedGrant, LeaveError> {
        let grant_date = parse_date("grant_date", &self.grant_date)?;
        let work_date = parse_date("work_date", &self.work_date)?;
        let expire_date = parse_date("expire_date", &self.expire_date)?;

        if !self.granted_days.is_finite() || self.granted_days <= 0.0 {
            return Err(LeaveError::validation("granted days must be greater than zero"));
        }
        if expire_date < grant_date {
            return Err(LeaveError::validation("expire date cannot be before grant date"));
        }

        Ok(ParsedGrant {
            grant_date,
            work_date,
            expire_date,
            granted_days: self.granted_days,
            reason: self.reason.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GrantSummary {
    #[serde(flatten)]
    pub totals: LedgerTotals,
    pub grants: Vec<SubstituteLeaveGrant>,
}

/// Draws `days` from the eligible grants, soonest expiry first, ties by creation order.
///
/// Returns only the grants that were touched. Fails without side effects when the eligible
/// grants cannot cover `days`.
pub(crate) fn draw_down(
    grants: Vec<SubstituteLeaveGrant>,
    days: f64,
    now: NaiveDateTime,
) -> Result<Vec<SubstituteLeaveGrant>, LeaveError> {
    let mut eligible: Vec<_> = grants.into_iter().filter(|g| g.is_eligible(now)).collect();
    eligible.sort_by(|a, b| a.expire_date.cmp(&b.expire_date).then(a.id.cmp(&b.id)));

    let mut outstanding = days;
    let mut touched = Vec::new();
    for mut grant in eligible {
        if outstanding <= DAY_EPSILON {
            break;
        }
        outstanding -= grant.draw(outstanding, now);
        touched.push(grant);
    }

    if outstanding > DAY_EPSILON {
        return Err(LeaveError::InsufficientSubstituteBalance {
            shortfall: outstanding,
        });
    }
    Ok(touched)
}

/// Flips every grant past its expiry to expired. Idempotent.
pub(crate) async fn expire_due_grants(
    tx: &mut dyn LeaveTx,
    user_id: u64,
    now: NaiveDateTime,
) -> Result<usize, LeaveError> {
    let mut expired = 0;
    for mut grant in tx.grants_for_user(user_id).await? {
        if grant.is_expired || !grant.is_past_expiry(now) {
            continue;
        }
        info!(
            grant_id = grant.id,
            user_id,
            expire_date = %grant.expire_date,
            forfeited_days = grant.remaining_days,
            "Substitute leave grant expired"
        );
        grant.mark_expired(now);
        tx.save_grant(&grant).await?;
        expired += 1;
    }
    Ok(expired)
}

/// Consumes `days` of substitute leave and reconciles the balance row from the ledger.
pub(crate) async fn allocate(
    tx: &mut dyn LeaveTx,
    substitute: &SubstituteLeaveType,
    user_id: u64,
    days: f64,
    now: NaiveDateTime,
) -> Result<(), LeaveError> {
    let expired = expire_due_grants(tx, user_id, now).await?;

    let grants = tx.grants_for_user(user_id).await?;
    let drawn = match draw_down(grants, days, now) {
        Ok(drawn) => drawn,
        Err(e) => {
            warn!(user_id, days, error = %e, "Substitute grants do not cover the requested days");
            return Err(e);
        }
    };
    for grant in &drawn {
        tx.save_grant(grant).await?;
    }

    // Expiries shrink the ledger total too, so rebuild the whole row in that case.
    let mode = if expired > 0 {
        Reconcile::Ledger
    } else {
        Reconcile::Usage
    };
    reconcile_balance(tx, substitute, user_id, mode, now).await?;

    info!(user_id, days, grants_touched = drawn.len(), "Substitute leave allocated");
    Ok(())
}

impl LeaveService {
    /// Grants as they stand now; expiry is reported, not written.
    #[instrument(skip(self))]
    pub async fn list_grants(&self, user_id: u64) -> Result<Vec<SubstituteLeaveGrant>, LeaveError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let grants = tx.grants_for_user(user_id).await?;
        Ok(grants.iter().map(|g| g.effective(now)).collect())
    }

    pub async fn grant_summary(&self, user_id: u64) -> Result<GrantSummary, LeaveError> {
        let grants = self.list_grants(user_id).await?;
        let totals = live_totals(&grants);
        Ok(GrantSummary { totals, grants })
    }

    /// Persists expiry for every lapsed grant of the user and rebuilds the balance row.
    #[instrument(skip(self))]
    pub async fn reconcile_expired_grants(&self, user_id: u64) -> Result<usize, LeaveError> {
        let substitute = self.catalog.require_substitute()?;
        let _guard = self.locks.acquire(user_id, substitute.id).await;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let expired = expire_due_grants(&mut *tx, user_id, now).await?;
        reconcile_balance(&mut *tx, substitute, user_id, Reconcile::Ledger, now).await?;
        tx.commit().await?;

        info!(user_id, expired, "Expired substitute grants reconciled");
        Ok(expired)
    }

    /// Draws substitute leave outside of a leave request.
    #[instrument(skip(self))]
    pub async fn allocate_substitute_days(&self, user_id: u64, days: f64) -> Result<(), LeaveError> {
        if !days.is_finite() || days <= 0.0 {
            return Err(LeaveError::validation("days must be greater than zero"));
        }
        let substitute = self.catalog.require_substitute()?;
        let _guard = self.locks.acquire(user_id, substitute.id).await;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        allocate(&mut *tx, substitute, user_id, days, now).await?;
        tx.commit().await
    }

    #[instrument(skip(self, input), fields(granted_days = input.granted_days))]
    pub async fn create_grant(
        &self,
        user_id: u64,
        input: &GrantFields,
    ) -> Result<SubstituteLeaveGrant, LeaveError> {
        let parsed = input.parse().inspect_err(|e| warn!(error = %e, "Invalid grant input"))?;
        let substitute = self.catalog.require_substitute()?;
        let _guard = self.locks.acquire(user_id, substitute.id).await;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        expire_due_grants(&mut *tx, user_id, now).await?;
        let grant = tx
            .insert_grant(NewSubstituteLeaveGrant {
                user_id,
                grant_date: parsed.grant_date,
                work_date: parsed.work_date,
                granted_days: parsed.granted_days,
                expire_date: parsed.expire_date,
                reason: parsed.reason,
                created_at: now,
            })
            .await?;
        let balance =
            reconcile_balance(&mut *tx, substitute, user_id, Reconcile::Ledger, now).await?;
        tx.commit().await?;

        info!(
            grant_id = grant.id,
            remaining_days = balance.remaining_days,
            "Substitute leave grant created"
        );

        notify_quietly(
            self.notifier.as_ref(),
            user_id,
            "substitute_leave_granted",
            json!({
                "grant_id": grant.id,
                "granted_days": grant.granted_days,
                "expire_date": grant.expire_date,
            }),
        )
        .await;

        Ok(grant)
    }

    #[instrument(skip(self, input), fields(granted_days = input.granted_days))]
    pub async fn update_grant(
        &self,
        grant_id: u64,
        input: &GrantFields,
    ) -> Result<SubstituteLeaveGrant, LeaveError> {
        let parsed = input.parse().inspect_err(|e| warn!(error = %e, "Invalid grant input"))?;
        let substitute = self.catalog.require_substitute()?;
        let user_id = self.grant_owner(grant_id).await?;
        let _guard = self.locks.acquire(user_id, substitute.id).await;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        expire_due_grants(&mut *tx, user_id, now).await?;
        let mut grant = load_grant(&mut *tx, grant_id).await?;

        if parsed.granted_days < grant.used_days {
            warn!(
                grant_id,
                used_days = grant.used_days,
                granted_days = parsed.granted_days,
                "Granted days below used days"
            );
            return Err(LeaveError::validation(format!(
                "granted days cannot be less than the {} days already used",
                grant.used_days
            )));
        }

        grant.grant_date = parsed.grant_date;
        grant.work_date = parsed.work_date;
        grant.granted_days = parsed.granted_days;
        grant.expire_date = parsed.expire_date;
        grant.reason = parsed.reason;
        grant.updated_at = now;
        grant.recompute_remaining();
        if !grant.is_expired && grant.is_past_expiry(now) {
            info!(grant_id, expire_date = %grant.expire_date, "Updated grant is already expired");
            grant.mark_expired(now);
        }

        tx.save_grant(&grant).await?;
        reconcile_balance(&mut *tx, substitute, user_id, Reconcile::Ledger, now).await?;
        tx.commit().await?;

        info!(grant_id, remaining_days = grant.remaining_days, "Substitute leave grant updated");
        Ok(grant)
    }

    #[instrument(skip(self))]
    pub async fn delete_grant(&self, grant_id: u64) -> Result<(), LeaveError> {
        let substitute = self.catalog.require_substitute()?;
        let user_id = self.grant_owner(grant_id).await?;
        let _guard = self.locks.acquire(user_id, substitute.id).await;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        expire_due_grants(&mut *tx, user_id, now).await?;
        let grant = load_grant(&mut *tx, grant_id).await?;

        if grant.used_days > 0.0 {
            warn!(grant_id, used_days = grant.used_days, "Refusing to delete a used grant");
            return Err(LeaveError::CannotDelete {
                grant_id,
                used_days: grant.used_days,
            });
        }

        tx.delete_grant(grant_id).await?;
        reconcile_balance(&mut *tx, substitute, user_id, Reconcile::Ledger, now).await?;
        tx.commit().await?;

        info!(grant_id, user_id, "Substitute leave grant deleted");
        Ok(())
    }

    async fn grant_owner(&self, grant_id: u64) -> Result<u64, LeaveError> {
        let mut tx = self.store.begin().await?;
        Ok(load_grant(&mut *tx, grant_id).await?.user_id)
    }
}

async fn load_grant(tx: &mut dyn LeaveTx, grant_id: u64) -> Result<SubstituteLeaveGrant, LeaveError> {
    tx.grant_by_id(grant_id)
        .await?
        .ok_or_else(|| LeaveError::not_found(format!("substitute leave grant {grant_id}")))
}
