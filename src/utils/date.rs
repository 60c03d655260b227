use chrono::NaiveDate;

use crate::error::LeaveError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Strips any time-of-day suffix, `2026-01-05T09:00:00` and `2026-01-05 09:00` both give `2026-01-05`.
pub fn extract_date_part(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.find(['T', ' ']) {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

fn invalid_date(field: &str, raw: &str) -> LeaveError {
    LeaveError::validation(format!("invalid {field}: '{raw}' (expected YYYY-MM-DD)"))
}

/// Exactly four year digits, two month digits and two day digits. chrono alone also takes
/// unpadded fields and a leading sign.
fn has_date_shape(value: &str) -> bool {
    value.len() == 10
        && value.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Parses a calendar date (`YYYY-MM-DD`), naming the offending field on failure.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, LeaveError> {
    let value = raw.trim();
    if !has_date_shape(value) {
        return Err(invalid_date(field, raw));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid_date(field, raw))
}

/// Like [`parse_date`] but ignores a time-of-day suffix. Errors quote the value as submitted.
pub fn parse_date_part(field: &str, raw: &str) -> Result<NaiveDate, LeaveError> {
    parse_date(field, extract_date_part(raw)).map_err(|_| invalid_date(field, raw))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_date_part() {
        assert_eq!(extract_date_part("2026-01-05"), "2026-01-05");
        assert_eq!(extract_date_part("2026-01-05T09:30:00Z"), "2026-01-05");
        assert_eq!(extract_date_part(" 2026-01-05 13:00 "), "2026-01-05");
    }

    #[test]
    fn test_parse_date_ok() {
        let date = parse_date("grant_date", "2026-03-31").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
        assert_eq!(format_date(date), "2026-03-31");
    }

    #[test]
    fn test_parse_date_names_field_and_value() {
        let err = parse_date("expire_date", "31/03/2026").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("expire_date"));
        assert!(message.contains("31/03/2026"));
        assert!(matches!(err, LeaveError::Validation(_)));
    }

    #[test]
    fn test_parse_date_rejects_impossible_day() {
        assert!(parse_date("leave_date", "2026-02-30").is_err());
    }

    #[test]
    fn test_parse_date_requires_padded_fields() {
        for raw in ["2026-1-5", "2026-01-5", "2026-1-05", "+2026-01-05", "20260105", "2026/01/05"] {
            let err = parse_date("leave_date", raw).unwrap_err();
            assert!(matches!(err, LeaveError::Validation(_)), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_parse_date_part_quotes_raw_value() {
        assert_eq!(
            parse_date_part("leave_date", "2026-01-05T09:00").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );

        let message = parse_date_part("leave_date", "2026-13-05T09:00")
            .unwrap_err()
            .to_string();
        assert!(message.contains("'2026-13-05T09:00'"), "{message}");
    }
}
