use chrono::NaiveDate;

use crate::models::{SleepRecord, SleepStatus};

/// Rounded mean of the per-status quality scores, 0 for an empty slice.
pub fn sleep_score(records: &[SleepRecord]) -> i32 {
    if records.is_empty() {
        return 0;
    }

    let total: i32 = records.iter().map(|r| r.status.score()).sum();
    (f64::from(total) / records.len() as f64).round() as i32
}

/// Count of records per status, zero-filled so every status is present.
pub fn status_distribution(records: &[SleepRecord]) -> Vec<(SleepStatus, usize)> {
    let mut distribution: Vec<(SleepStatus, usize)> =
        SleepStatus::ALL.iter().map(|s| (*s, 0)).collect();

    for record in records {
        if let Some(entry) = distribution.iter_mut().find(|(s, _)| *s == record.status) {
            entry.1 += 1;
        }
    }

    distribution
}

pub fn records_in_range(
    records: &[SleepRecord],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<SleepRecord> {
    records
        .iter()
        .filter(|r| r.date >= from && r.date <= to)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(date: NaiveDate, status: SleepStatus) -> SleepRecord {
        SleepRecord {
            date,
            status,
            note: String::new(),
            updated_at: Utc::now(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[test]
    fn empty_slice_scores_zero() {
        assert_eq!(sleep_score(&[]), 0);
    }

    #[test]
    fn score_is_rounded_mean() {
        let records = vec![
            record(day(1), SleepStatus::Excellent),
            record(day(2), SleepStatus::Average),
            record(day(3), SleepStatus::Late),
        ];
        // (100 + 60 + 50) / 3 = 70
        assert_eq!(sleep_score(&records), 70);

        let records = vec![
            record(day(4), SleepStatus::Excellent),
            record(day(5), SleepStatus::Poor),
            record(day(6), SleepStatus::Poor),
        ];
        // (100 + 40 + 40) / 3 = 60.0 exactly
        assert_eq!(sleep_score(&records), 60);
    }

    #[test]
    fn distribution_zero_fills_every_status() {
        let records = vec![
            record(day(1), SleepStatus::Good),
            record(day(2), SleepStatus::Good),
            record(day(3), SleepStatus::Late),
        ];
        let distribution = status_distribution(&records);
        assert_eq!(distribution.len(), SleepStatus::ALL.len());

        let count = |status| {
            distribution
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, c)| *c)
                .unwrap()
        };
        assert_eq!(count(SleepStatus::Good), 2);
        assert_eq!(count(SleepStatus::Late), 1);
        assert_eq!(count(SleepStatus::VeryPoor), 0);
    }

    #[test]
    fn range_filter_is_inclusive() {
        let records = vec![
            record(day(1), SleepStatus::Good),
            record(day(15), SleepStatus::Average),
            record(day(31), SleepStatus::Poor),
        ];
        let in_range = records_in_range(&records, day(1), day(15));
        assert_eq!(in_range.len(), 2);
    }
}
