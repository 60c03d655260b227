use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info};

use crate::error::LeaveError;
use crate::leave::store::LeaveTx;
use crate::model::leave_type::{LeaveKind, LeaveType};

/// The leave type whose balance is derived from the substitute grant ledger.
///
/// Resolved once when the service starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstituteLeaveType {
    pub id: u64,
    pub code: String,
}

/// Read-only lookup of configured leave types, fronted by a TTL cache.
pub struct LeaveTypeCatalog {
    cache: Cache<u64, LeaveType>,
    substitute: Option<SubstituteLeaveType>,
}

impl LeaveTypeCatalog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
            substitute: None,
        }
    }

    /// Resolves the substitute leave type by code and primes the cache with every active type.
    pub async fn load(&mut self, tx: &mut dyn LeaveTx, substitute_code: &str) -> Result<(), LeaveError> {
        self.substitute = tx
            .leave_type_by_code(substitute_code)
            .await?
            .map(|lt| SubstituteLeaveType {
                id: lt.id,
                code: lt.code,
            });

        match &self.substitute {
            Some(sub) => info!(leave_type_id = sub.id, code = %sub.code, "Substitute leave type resolved"),
            None => info!(code = substitute_code, "No substitute leave type configured"),
        }

        let types = self.list(tx).await?;
        for lt in &types {
            self.cache.insert(lt.id, lt.clone()).await;
        }
        info!(count = types.len(), "Leave type cache warmup complete");
        Ok(())
    }

    pub fn require_substitute(&self) -> Result<&SubstituteLeaveType, LeaveError> {
        self.substitute
            .as_ref()
            .ok_or_else(|| LeaveError::not_found("substitute leave type"))
    }

    pub async fn by_id(&self, tx: &mut dyn LeaveTx, id: u64) -> Result<LeaveType, LeaveError> {
        if let Some(lt) = self.cache.get(&id).await {
            debug!(leave_type_id = id, "Leave type cache hit");
            return Ok(lt);
        }

        let lt = tx
            .leave_type_by_id(id)
            .await?
            .map(|lt| self.classify(lt))
            .ok_or_else(|| LeaveError::not_found(format!("leave type {id}")))?;
        self.cache.insert(id, lt.clone()).await;
        Ok(lt)
    }

    pub async fn list(&self, tx: &mut dyn LeaveTx) -> Result<Vec<LeaveType>, LeaveError> {
        Ok(tx
            .active_leave_types()
            .await?
            .into_iter()
            .map(|lt| self.classify(lt))
            .collect())
    }

    fn classify(&self, mut lt: LeaveType) -> LeaveType {
        lt.kind = match &self.substitute {
            Some(sub) if sub.id == lt.id => LeaveKind::Substitute,
            _ => LeaveKind::Standard,
        };
        lt
    }
}
