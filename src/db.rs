use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{AnalysisResult, SleepRecord, SleepStatus};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert or overwrite the record for a date. Last write for a date wins;
/// records are never deleted.
pub async fn upsert_record(
    pool: &PgPool,
    date: NaiveDate,
    status: SleepStatus,
    note: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sleep_calendar.sleep_records (date, status, note, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (date) DO UPDATE
        SET status = EXCLUDED.status, note = EXCLUDED.note, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(date)
    .bind(status.as_str())
    .bind(note)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_record(pool: &PgPool, date: NaiveDate) -> anyhow::Result<Option<SleepRecord>> {
    let row = sqlx::query(
        "SELECT date, status, note, updated_at FROM sleep_calendar.sleep_records WHERE date = $1",
    )
    .bind(date)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_record).transpose()
}

/// Records within an inclusive date range, oldest first.
pub async fn fetch_records(
    pool: &PgPool,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<SleepRecord>> {
    let rows = sqlx::query(
        "SELECT date, status, note, updated_at FROM sleep_calendar.sleep_records \
         WHERE date >= $1 AND date <= $2 ORDER BY date",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_record).collect()
}

/// Every record, newest first.
pub async fn fetch_all_records(pool: &PgPool) -> anyhow::Result<Vec<SleepRecord>> {
    let rows = sqlx::query(
        "SELECT date, status, note, updated_at FROM sleep_calendar.sleep_records \
         ORDER BY date DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(row_to_record).collect()
}

/// Cache an analysis under its key ("YYYY-MM-DD" or "YYYY-MM"), replacing
/// any earlier run.
pub async fn upsert_analysis(pool: &PgPool, result: &AnalysisResult) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sleep_calendar.sleep_analyses (key, analysis, created_at, records_analyzed)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (key) DO UPDATE
        SET analysis = EXCLUDED.analysis,
            created_at = EXCLUDED.created_at,
            records_analyzed = EXCLUDED.records_analyzed
        "#,
    )
    .bind(&result.key)
    .bind(&result.analysis)
    .bind(result.created_at)
    .bind(result.records_analyzed)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_analysis(pool: &PgPool, key: &str) -> anyhow::Result<Option<AnalysisResult>> {
    let row = sqlx::query(
        "SELECT key, analysis, created_at, records_analyzed \
         FROM sleep_calendar.sleep_analyses WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| AnalysisResult {
        key: row.get("key"),
        analysis: row.get("analysis"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        records_analyzed: row.get("records_analyzed"),
    }))
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        date: NaiveDate,
        status: SleepStatus,
        #[serde(default)]
        note: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        upsert_record(pool, row.date, row.status, &row.note).await?;
        imported += 1;
    }

    Ok(imported)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let records = [
        (
            NaiveDate::from_ymd_opt(2026, 8, 3).context("invalid date")?,
            SleepStatus::Poor,
            "第二天有重要会议，翻来覆去到凌晨一点多才睡着",
        ),
        (
            NaiveDate::from_ymd_opt(2026, 8, 8).context("invalid date")?,
            SleepStatus::Late,
            "周末熬夜看球赛，差不多两点才上床",
        ),
        (
            NaiveDate::from_ymd_opt(2026, 8, 12).context("invalid date")?,
            SleepStatus::Average,
            "睡前刷手机刷了一个多小时，入睡有点慢",
        ),
        (
            NaiveDate::from_ymd_opt(2026, 8, 19).context("invalid date")?,
            SleepStatus::Good,
            "",
        ),
    ];

    for (date, status, note) in records {
        upsert_record(pool, date, status, note).await?;
    }

    Ok(())
}

fn row_to_record(row: PgRow) -> anyhow::Result<SleepRecord> {
    let status: String = row.get("status");
    Ok(SleepRecord {
        date: row.get("date"),
        status: SleepStatus::parse(&status)?,
        note: row.get("note"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}
