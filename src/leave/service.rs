use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::error::LeaveError;
use crate::leave::catalog::LeaveTypeCatalog;
use crate::leave::clock::Clock;
use crate::leave::lock::UserLocks;
use crate::leave::notify::NotificationGateway;
use crate::leave::store::LeaveStore;
use crate::model::holiday::Holiday;
use crate::model::leave_balance::BalanceView;
use crate::model::leave_type::LeaveType;

#[derive(Debug, Clone)]
pub struct LeaveSettings {
    pub substitute_code: String,
    pub leave_type_cache_ttl: Duration,
}

impl Default for LeaveSettings {
    fn default() -> Self {
        Self {
            substitute_code: "substitute".to_string(),
            leave_type_cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Entry point of the leave engine. Each public operation runs in a single transaction.
pub struct LeaveService {
    pub(crate) store: Arc<dyn LeaveStore>,
    pub(crate) catalog: LeaveTypeCatalog,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) locks: UserLocks,
    pub(crate) notifier: Arc<dyn NotificationGateway>,
}

impl LeaveService {
    pub async fn init(
        store: Arc<dyn LeaveStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationGateway>,
        settings: LeaveSettings,
    ) -> Result<Self, LeaveError> {
        let mut catalog = LeaveTypeCatalog::new(settings.leave_type_cache_ttl);

        let mut tx = store.begin().await?;
        catalog.load(&mut *tx, &settings.substitute_code).await?;
        drop(tx);

        Ok(Self {
            store,
            catalog,
            clock,
            locks: UserLocks::default(),
            notifier,
        })
    }

    pub async fn list_leave_types(&self) -> Result<Vec<LeaveType>, LeaveError> {
        let mut tx = self.store.begin().await?;
        self.catalog.list(&mut *tx).await
    }

    #[instrument(skip(self))]
    pub async fn list_balances(&self, user_id: u64) -> Result<Vec<BalanceView>, LeaveError> {
        let mut tx = self.store.begin().await?;
        let balances = tx.balances_for_user(user_id).await?;

        let mut views = Vec::with_capacity(balances.len());
        for balance in balances {
            let leave_type = self.catalog.by_id(&mut *tx, balance.leave_type_id).await?;
            views.push(BalanceView {
                balance,
                leave_type_name: leave_type.name,
            });
        }

        info!(count = views.len(), "Leave balances fetched");
        Ok(views)
    }

    /// Holidays of a calendar year.
    #[instrument(skip(self))]
    pub async fn holidays(&self, year: i32) -> Result<Vec<Holiday>, LeaveError> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| LeaveError::validation(format!("invalid year: {year}")))?;
        let until = NaiveDate::from_ymd_opt(year + 1, 1, 1)
            .ok_or_else(|| LeaveError::validation(format!("invalid year: {year}")))?;

        let mut tx = self.store.begin().await?;
        tx.holidays_between(from, until).await
    }
}
