use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of per-day sleep statuses a user can pick on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SleepStatus {
    Excellent,
    Good,
    Average,
    Poor,
    VeryPoor,
    Late,
}

impl SleepStatus {
    pub const ALL: [SleepStatus; 6] = [
        SleepStatus::Excellent,
        SleepStatus::Good,
        SleepStatus::Average,
        SleepStatus::Poor,
        SleepStatus::VeryPoor,
        SleepStatus::Late,
    ];

    /// Stable wire value used in the database and CSV imports.
    pub fn as_str(self) -> &'static str {
        match self {
            SleepStatus::Excellent => "excellent",
            SleepStatus::Good => "good",
            SleepStatus::Average => "average",
            SleepStatus::Poor => "poor",
            SleepStatus::VeryPoor => "veryPoor",
            SleepStatus::Late => "late",
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<SleepStatus> {
        match value {
            "excellent" => Ok(SleepStatus::Excellent),
            "good" => Ok(SleepStatus::Good),
            "average" => Ok(SleepStatus::Average),
            "poor" => Ok(SleepStatus::Poor),
            "veryPoor" => Ok(SleepStatus::VeryPoor),
            "late" => Ok(SleepStatus::Late),
            other => bail!("unknown sleep status: {other}"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SleepStatus::Excellent => "睡的很好",
            SleepStatus::Good => "睡的不错",
            SleepStatus::Average => "一般",
            SleepStatus::Poor => "糟糕睡眠",
            SleepStatus::VeryPoor => "极差",
            SleepStatus::Late => "晚睡",
        }
    }

    /// 0-100 quality score used for monthly averaging.
    pub fn score(self) -> i32 {
        match self {
            SleepStatus::Excellent => 100,
            SleepStatus::Good => 80,
            SleepStatus::Average => 60,
            SleepStatus::Poor => 40,
            SleepStatus::VeryPoor => 20,
            SleepStatus::Late => 50,
        }
    }
}

/// One user-entered day of sleep. The date is the natural key; saving the
/// same date again overwrites the previous record.
#[derive(Debug, Clone)]
pub struct SleepRecord {
    pub date: NaiveDate,
    pub status: SleepStatus,
    pub note: String,
    pub updated_at: DateTime<Utc>,
}

/// Cached LLM analysis text, keyed by "YYYY-MM-DD" for a single day or
/// "YYYY-MM" for a monthly aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub key: String,
    pub analysis: String,
    pub created_at: DateTime<Utc>,
    pub records_analyzed: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_value() {
        for status in SleepStatus::ALL {
            assert_eq!(SleepStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(SleepStatus::parse("great").is_err());
    }

    #[test]
    fn scores_match_status_catalogue() {
        assert_eq!(SleepStatus::Excellent.score(), 100);
        assert_eq!(SleepStatus::Late.score(), 50);
        assert_eq!(SleepStatus::VeryPoor.score(), 20);
    }
}
