use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

/// Outbound notification delivery.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify(&self, user_id: u64, kind: &str, payload: Value) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogNotificationGateway;

#[async_trait]
impl NotificationGateway for LogNotificationGateway {
    async fn notify(&self, user_id: u64, kind: &str, payload: Value) -> anyhow::Result<()> {
        info!(user_id, kind, %payload, "Notification queued");
        Ok(())
    }
}

/// Fire and forget: failures are logged, never returned.
pub async fn notify_quietly(gateway: &dyn NotificationGateway, user_id: u64, kind: &str, payload: Value) {
    if let Err(e) = gateway.notify(user_id, kind, payload).await {
        warn!(error = %e, user_id, kind, "Notification delivery failed");
    }
}
