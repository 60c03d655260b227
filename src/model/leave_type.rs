use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How a leave type keeps its balance row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveKind {
    /// The balance row is the only source of truth.
    #[default]
    Standard,
    /// The balance row is derived from the substitute grant ledger.
    Substitute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "substitute")]
    pub code: String,
    #[schema(example = "Substitute leave")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 0.0)]
    pub default_days: f64,
    pub is_hourly_available: bool,
    pub reason_required: bool,
    pub gender_specific: bool,
    pub display_order: i32,
    pub is_active: bool,
    #[sqlx(skip)]
    pub kind: LeaveKind,
}
