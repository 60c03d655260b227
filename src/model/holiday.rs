use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub holiday_date: NaiveDate,
    #[schema(example = "New Year's Day")]
    pub holiday_name: String,
    #[schema(example = "national")]
    pub holiday_type: String,
}
