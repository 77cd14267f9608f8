use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod analyze;
mod calendar;
mod db;
mod models;
mod parser;
mod report;
mod stats;

use analyze::CompletionClient;
use models::{AnalysisResult, SleepStatus};

#[derive(Parser)]
#[command(name = "sleep-calendar")]
#[command(about = "Personal sleep-tracking calendar with AI note analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Save a day's sleep status and note (overwrites an existing day)
    Record {
        #[arg(long)]
        date: NaiveDate,
        /// excellent, good, average, poor, veryPoor or late
        #[arg(long)]
        status: String,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Import records from a CSV file (columns: date,status,note)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the month calendar grid
    Month {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Show sleep score and status distribution for a month
    Stats {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Run AI analysis on one day's note and cache the result
    Analyze {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Run AI analysis across a whole month of notes
    AnalyzeMonth {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Show a cached analysis, parsed into sections
    ShowAnalysis {
        /// "YYYY-MM-DD" for a day, "YYYY-MM" for a monthly aggregate
        #[arg(long)]
        key: String,
        /// Print the cached analysis and its parsed report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown month report
    Report {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Record { date, status, note } => {
            let status = SleepStatus::parse(&status)?;
            db::upsert_record(&pool, date, status, &note).await?;
            println!("Recorded {date} as {} ({}).", status.label(), status.as_str());
        }
        Commands::Import { csv } => {
            let imported = db::import_csv(&pool, &csv).await?;
            println!("Imported {imported} records from {}.", csv.display());
        }
        Commands::Month { year, month } => {
            let (year, month) = resolve_month(year, month);
            let records = fetch_month(&pool, year, month).await?;
            println!("{year}-{month:02}");
            print!("{}", report::render_grid(year, month, &records)?);
        }
        Commands::Stats { year, month } => {
            let (year, month) = resolve_month(year, month);
            let (from, to) = calendar::month_bounds(year, month)?;
            let all = db::fetch_all_records(&pool).await?;
            let records = stats::records_in_range(&all, from, to);

            if records.is_empty() {
                println!("No records for {year}-{month:02}.");
                return Ok(());
            }

            println!(
                "Sleep score for {year}-{month:02}: {} across {} days",
                stats::sleep_score(&records),
                records.len()
            );
            for (status, count) in stats::status_distribution(&records) {
                if count > 0 {
                    println!("- {} ({}): {}", status.label(), status.as_str(), count);
                }
            }
        }
        Commands::Analyze { date } => {
            let record = db::fetch_record(&pool, date)
                .await?
                .with_context(|| format!("no record saved for {date}"))?;

            let client = CompletionClient::from_env()?;
            let analysis = client.analyze_note(date, &record.note).await?;

            let result = AnalysisResult {
                key: date.to_string(),
                analysis,
                created_at: Utc::now(),
                records_analyzed: None,
            };
            db::upsert_analysis(&pool, &result).await?;
            print!("{}", report::render_analysis(&result));
        }
        Commands::AnalyzeMonth { year, month } => {
            let (year, month) = resolve_month(year, month);
            let records = fetch_month(&pool, year, month).await?;

            let client = CompletionClient::from_env()?;
            let monthly = client.analyze_month(&records).await?;

            let result = AnalysisResult {
                key: calendar::month_key(year, month),
                analysis: monthly.analysis,
                created_at: Utc::now(),
                records_analyzed: Some(monthly.records_analyzed),
            };
            db::upsert_analysis(&pool, &result).await?;
            print!("{}", report::render_analysis(&result));
        }
        Commands::ShowAnalysis { key, json } => {
            let result = db::fetch_analysis(&pool, &key)
                .await?
                .with_context(|| format!("no cached analysis under key {key}"))?;

            if json {
                println!("{}", report::analysis_json(&result)?);
            } else {
                print!("{}", report::render_analysis(&result));
            }
        }
        Commands::Report { year, month, out } => {
            let (year, month) = resolve_month(year, month);
            let records = fetch_month(&pool, year, month).await?;
            let analysis = db::fetch_analysis(&pool, &calendar::month_key(year, month)).await?;

            let rendered =
                report::build_month_report(year, month, &records, analysis.as_ref())?;
            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn resolve_month(year: Option<i32>, month: Option<u32>) -> (i32, u32) {
    let today = Utc::now().date_naive();
    (year.unwrap_or_else(|| today.year()), month.unwrap_or_else(|| today.month()))
}

async fn fetch_month(pool: &PgPool, year: i32, month: u32) -> anyhow::Result<Vec<models::SleepRecord>> {
    let (from, to) = calendar::month_bounds(year, month)?;
    db::fetch_records(pool, from, to).await
}
