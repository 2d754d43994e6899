use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;

/// Week date ranges for the 2026 season (Monday..Friday inclusive).
pub static CAMP_WEEK_DATES: Lazy<Vec<(u32, NaiveDate, NaiveDate)>> = Lazy::new(|| {
    let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
    vec![
        (1, d("2026-06-08"), d("2026-06-12")),
        (2, d("2026-06-15"), d("2026-06-19")),
        (3, d("2026-06-22"), d("2026-06-26")),
        (4, d("2026-06-29"), d("2026-07-03")),
        (5, d("2026-07-06"), d("2026-07-10")),
        (6, d("2026-07-13"), d("2026-07-17")),
        (7, d("2026-07-20"), d("2026-07-24")),
        (8, d("2026-07-27"), d("2026-07-31")),
        (9, d("2026-08-03"), d("2026-08-07")),
    ]
});

/// Camp week number (1-9) containing `date`, or None outside the season.
pub fn camp_week(date: NaiveDate) -> Option<u32> {
    CAMP_WEEK_DATES
        .iter()
        .find(|(_, start, end)| *start <= date && date <= *end)
        .map(|(week, _, _)| *week)
}

/// Week number used when persisting records: 0 outside camp weeks so
/// recording stays possible year-round.
pub fn record_week(date: NaiveDate) -> i64 {
    camp_week(date).unwrap_or(0) as i64
}

/// True on weekdays that fall inside a camp week.
pub fn is_camp_day(date: NaiveDate) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    camp_week(date).is_some()
}
