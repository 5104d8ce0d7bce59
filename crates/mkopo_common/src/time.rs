use chrono::{Datelike, Days, NaiveDate, Utc};

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `date + n` calendar days, saturating at the calendar limits.
pub fn days_from(date: NaiveDate, n: u64) -> NaiveDate {
    date.checked_add_days(Days::new(n)).unwrap_or(date)
}

pub fn parse_ymd(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn fmt_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_of_month_resets_day() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        assert_eq!(first_of_month(d), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn days_from_crosses_month_boundary() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 28).unwrap();
        assert_eq!(days_from(d, 7), NaiveDate::from_ymd_opt(2025, 2, 4).unwrap());
    }

    #[test]
    fn ymd_parse_and_format_agree() {
        let d = parse_ymd("2025-06-09").unwrap();
        assert_eq!(fmt_ymd(d), "2025-06-09");
        assert!(parse_ymd("09/06/2025").is_none());
    }
}
