use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate};

/// One cell of the month grid. Cells outside the month belong to the
/// trailing days of the previous month or the leading days of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub day: u32,
    pub date: NaiveDate,
    pub in_month: bool,
}

/// Six full weeks (42 cells) covering the given month, weeks starting on
/// Sunday.
pub fn calendar_days(year: i32, month: u32) -> anyhow::Result<Vec<CalendarDay>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid month {year}-{month:02}"))?;
    let lead = first.weekday().num_days_from_sunday() as i64;
    let start = first - Duration::days(lead);

    let days = (0..42)
        .map(|offset| {
            let date = start + Duration::days(offset);
            CalendarDay {
                day: date.day(),
                date,
                in_month: date.year() == year && date.month() == month,
            }
        })
        .collect();

    Ok(days)
}

/// First and last day of the month.
pub fn month_bounds(year: i32, month: u32) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .with_context(|| format!("invalid month {year}-{month:02}"))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .context("month arithmetic overflow")?;
    Ok((first, next - Duration::days(1)))
}

/// Cache key for a monthly analysis, e.g. "2026-08".
pub fn month_key(year: i32, month: u32) -> String {
    format!("{year}-{month:02}")
}
