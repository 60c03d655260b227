use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::leave_balance::LedgerTotals;

/// Make-up leave earned by working on an off-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SubstituteLeaveGrant {
    #[schema(example = 5)]
    pub id: u64,
    #[schema(example = 1000)]
    pub user_id: u64,
    #[schema(example = "2026-01-10", value_type = String, format = "date")]
    pub grant_date: NaiveDate,
    #[schema(example = "2026-01-04", value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(example = 1.0)]
    pub granted_days: f64,
    #[schema(example = 0.5)]
    pub used_days: f64,
    #[schema(example = 0.5)]
    pub remaining_days: f64,
    #[schema(example = "2026-07-10", value_type = String, format = "date")]
    pub expire_date: NaiveDate,
    #[schema(example = "Weekend release support")]
    pub reason: String,
    pub is_expired: bool,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubstituteLeaveGrant {
    pub user_id: u64,
    pub grant_date: NaiveDate,
    pub work_date: NaiveDate,
    pub granted_days: f64,
    pub expire_date: NaiveDate,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

impl SubstituteLeaveGrant {
    /// A grant lapses at the start of its expiry date.
    pub fn expires_at(&self) -> NaiveDateTime {
        self.expire_date.and_time(NaiveTime::MIN)
    }

    /// Strictly past expiry: a grant whose expiry instant equals `now` is still live.
    pub fn is_past_expiry(&self, now: NaiveDateTime) -> bool {
        self.expires_at() < now
    }

    /// Whether allocation may draw from this grant.
    pub fn is_eligible(&self, now: NaiveDateTime) -> bool {
        !self.is_expired && self.expires_at() > now && self.remaining_days > 0.0
    }

    /// Sticky: an expired grant keeps `is_expired` and never regains days.
    pub fn mark_expired(&mut self, now: NaiveDateTime) {
        self.is_expired = true;
        self.remaining_days = 0.0;
        self.updated_at = now;
    }

    /// Takes up to `days` from this grant and returns how much was taken.
    pub fn draw(&mut self, days: f64, now: NaiveDateTime) -> f64 {
        let take = self.remaining_days.min(days);
        self.used_days += take;
        self.remaining_days -= take;
        self.updated_at = now;
        take
    }

    pub fn recompute_remaining(&mut self) {
        self.remaining_days = if self.is_expired {
            0.0
        } else {
            self.granted_days - self.used_days
        };
    }

    /// The grant as it stands at `now`, without persisting anything.
    pub fn effective(&self, now: NaiveDateTime) -> Self {
        let mut grant = self.clone();
        if !grant.is_expired && grant.is_past_expiry(now) {
            grant.is_expired = true;
            grant.remaining_days = 0.0;
        }
        grant
    }
}

/// Sums granted/used/remaining over grants that have not expired.
pub fn live_totals<'a>(grants: impl IntoIterator<Item = &'a SubstituteLeaveGrant>) -> LedgerTotals {
    grants
        .into_iter()
        .filter(|g| !g.is_expired)
        .fold(LedgerTotals::default(), |mut acc, g| {
            acc.granted_days += g.granted_days;
            acc.used_days += g.used_days;
            acc.remaining_days += g.remaining_days;
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn grant(id: u64, remaining: f64, expire: &str) -> SubstituteLeaveGrant {
        SubstituteLeaveGrant {
            id,
            user_id: 1,
            grant_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            work_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            granted_days: remaining,
            used_days: 0.0,
            remaining_days: remaining,
            expire_date: NaiveDate::parse_from_str(expire, "%Y-%m-%d").unwrap(),
            reason: String::new(),
            is_expired: false,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_expiry_is_strict() {
        let g = grant(1, 1.0, "2026-03-01");
        assert!(!g.is_past_expiry(at("2026-03-01", "00:00:00")));
        assert!(g.is_past_expiry(at("2026-03-01", "00:00:01")));
        assert!(!g.is_past_expiry(at("2026-02-28", "23:59:59")));
    }

    #[test]
    fn test_eligibility() {
        let now = at("2026-02-01", "10:00:00");
        assert!(grant(1, 1.0, "2026-03-01").is_eligible(now));
        assert!(!grant(1, 0.0, "2026-03-01").is_eligible(now));
        assert!(!grant(1, 1.0, "2026-01-31").is_eligible(now));

        let mut expired = grant(1, 1.0, "2026-03-01");
        expired.mark_expired(now);
        assert!(!expired.is_eligible(now));
        assert_eq!(expired.remaining_days, 0.0);
    }

    #[test]
    fn test_draw_never_goes_negative() {
        let now = at("2026-02-01", "10:00:00");
        let mut g = grant(1, 1.0, "2026-03-01");
        assert_eq!(g.draw(2.5, now), 1.0);
        assert_eq!(g.remaining_days, 0.0);
        assert_eq!(g.used_days, 1.0);
        assert_eq!(g.draw(1.0, now), 0.0);
    }

    #[test]
    fn test_effective_does_not_touch_original() {
        let g = grant(1, 2.0, "2026-01-15");
        let view = g.effective(at("2026-02-01", "00:00:00"));
        assert!(view.is_expired);
        assert_eq!(view.remaining_days, 0.0);
        assert!(!g.is_expired);
        assert_eq!(g.remaining_days, 2.0);
    }

    #[test]
    fn test_live_totals_skip_expired() {
        let mut expired = grant(2, 3.0, "2026-01-15");
        expired.mark_expired(NaiveDateTime::default());
        let totals = live_totals(&[grant(1, 1.5, "2026-03-01"), expired]);
        assert_eq!(totals.granted_days, 1.5);
        assert_eq!(totals.remaining_days, 1.5);
        assert_eq!(totals.used_days, 0.0);
    }
}
