use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequestDetail {
    #[schema(example = 11)]
    pub id: u64,
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub leave_date: NaiveDate,
    #[schema(example = "09:00", nullable = true)]
    pub start_time: Option<String>,
    #[schema(example = "13:00", nullable = true)]
    pub end_time: Option<String>,
    #[schema(example = 1.0)]
    pub day_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = 2)]
    pub leave_type_id: u64,
    #[schema(example = "Substitute leave")]
    pub leave_type_name: String,
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub request_date: NaiveDate,
    pub is_hourly_based: bool,
    pub reason: String,
    #[schema(example = 1.5)]
    pub total_days: f64,
    pub status: LeaveStatus,
    pub approver_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub processed_at: Option<NaiveDateTime>,
    pub rejection_reason: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    pub details: Vec<LeaveRequestDetail>,
}

/// Detail row before it has been assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequestDetail {
    pub leave_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub day_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequest {
    pub user_id: u64,
    pub leave_type_id: u64,
    pub leave_type_name: String,
    pub request_date: NaiveDate,
    pub is_hourly_based: bool,
    pub reason: String,
    pub total_days: f64,
    pub created_at: NaiveDateTime,
    pub details: Vec<NewLeaveRequestDetail>,
}

/// A pending -> approved/rejected transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: LeaveStatus,
    pub approver_id: u64,
    pub processed_at: NaiveDateTime,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaveRequestFilter {
    pub user_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub page: u32,
    pub per_page: u32,
}

impl LeaveRequestFilter {
    pub const DEFAULT_PER_PAGE: u32 = 10;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn new(
        user_id: Option<u64>,
        status: Option<LeaveStatus>,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Self {
        Self {
            user_id,
            status,
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page.max(1) as u64 - 1) * self.per_page as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_strings() {
        assert_eq!(LeaveStatus::Pending.as_ref(), "pending");
        assert_eq!(LeaveStatus::Rejected.to_string(), "rejected");
        assert_eq!(LeaveStatus::from_str("approved").unwrap(), LeaveStatus::Approved);
        assert!(LeaveStatus::from_str("cancelled").is_err());
    }

    #[test]
    fn test_filter_pagination_bounds() {
        let filter = LeaveRequestFilter::new(None, None, Some(0), Some(500));
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, 100);
        assert_eq!(filter.offset(), 0);

        let filter = LeaveRequestFilter::new(Some(3), None, Some(3), None);
        assert_eq!(filter.per_page, 10);
        assert_eq!(filter.offset(), 20);
    }
}
