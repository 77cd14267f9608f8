use std::fmt::Write;

use serde::Serialize;

use crate::calendar;
use crate::models::{AnalysisResult, SleepRecord, SleepStatus};
use crate::parser;
use crate::stats;

/// Markdown report for one month: score, status mix, calendar grid, recent
/// notes, and the parsed monthly analysis when one is cached.
pub fn build_month_report(
    year: i32,
    month: u32,
    records: &[SleepRecord],
    analysis: Option<&AnalysisResult>,
) -> anyhow::Result<String> {
    let mut output = String::new();

    let _ = writeln!(output, "# Sleep Report {year}-{month:02}");
    let _ = writeln!(
        output,
        "Sleep score {} across {} recorded days.",
        stats::sleep_score(records),
        records.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    if records.is_empty() {
        let _ = writeln!(output, "No records for this month.");
    } else {
        for (status, count) in stats::status_distribution(records) {
            if count > 0 {
                let _ = writeln!(
                    output,
                    "- {} ({}): {} days",
                    status.label(),
                    status.as_str(),
                    count
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Calendar");
    let _ = writeln!(output, "```");
    output.push_str(&render_grid(year, month, records)?);
    let _ = writeln!(output, "```");

    let noted: Vec<&SleepRecord> = {
        let mut noted: Vec<&SleepRecord> = records.iter().filter(|r| !r.note.is_empty()).collect();
        noted.sort_by(|a, b| b.date.cmp(&a.date));
        noted
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Notes");
    if noted.is_empty() {
        let _ = writeln!(output, "No notes recorded for this month.");
    } else {
        for record in noted.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                record.date,
                record.status.label(),
                record.note
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Analysis");
    match analysis {
        None => {
            let _ = writeln!(
                output,
                "No cached analysis for this month. Run `analyze-month` first."
            );
        }
        Some(result) => {
            output.push_str(&render_analysis(result));
        }
    }

    Ok(output)
}

/// The parsed sections of one analysis, in display order: summary, patterns,
/// frequencies, suggestions, then the raw text.
pub fn render_analysis(result: &AnalysisResult) -> String {
    let report = parser::parse_report(&result.analysis);
    let mut output = String::new();

    let _ = writeln!(output, "### 分析摘要");
    let _ = writeln!(output, "{}", report.summary);

    if !report.patterns.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### 识别出的睡眠模式");
        for pattern in &report.patterns {
            let _ = writeln!(output, "- {pattern}");
        }
    }

    if !report.frequencies.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### 问题出现频率");
        let mut entries: Vec<(&String, &u32)> = report.frequencies.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (problem, count) in entries {
            let _ = writeln!(output, "- {problem}: {count}次");
        }
    }

    if !report.suggestions.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### 改进建议");
        for (index, suggestion) in report.suggestions.iter().enumerate() {
            let _ = writeln!(output, "{}. {suggestion}", index + 1);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### 原始分析");
    let _ = writeln!(output, "{}", result.analysis.trim_end());
    match result.records_analyzed {
        Some(count) => {
            let _ = writeln!(
                output,
                "Analyzed {} records at {}.",
                count,
                result.created_at.format("%Y-%m-%d %H:%M")
            );
        }
        None => {
            let _ = writeln!(
                output,
                "Analyzed at {}.",
                result.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    output
}

#[derive(Serialize)]
struct AnalysisJson<'a> {
    #[serde(flatten)]
    result: &'a AnalysisResult,
    parsed: parser::ParsedReport,
}

/// JSON view of a cached analysis: its stored metadata plus the parsed
/// sections.
pub fn analysis_json(result: &AnalysisResult) -> anyhow::Result<String> {
    let parsed = parser::parse_report(&result.analysis);
    Ok(serde_json::to_string_pretty(&AnalysisJson { result, parsed })?)
}

/// Text calendar, Sunday-first, each in-month day marked with its status
/// initial (`.` for unrecorded, blanks outside the month).
pub fn render_grid(year: i32, month: u32, records: &[SleepRecord]) -> anyhow::Result<String> {
    let days = calendar::calendar_days(year, month)?;
    let mut output = String::new();

    let _ = writeln!(output, " Su  Mo  Tu  We  Th  Fr  Sa");
    for week in days.chunks(7) {
        let row: Vec<String> = week
            .iter()
            .map(|cell| {
                if !cell.in_month {
                    "   ".to_string()
                } else {
                    let mark = records
                        .iter()
                        .find(|r| r.date == cell.date)
                        .map_or('.', |r| status_mark(r.status));
                    format!("{:>2}{mark}", cell.day)
                }
            })
            .collect();
        let _ = writeln!(output, "{}", row.join(" "));
    }

    let _ = writeln!(
        output,
        "E=excellent G=good A=average P=poor V=veryPoor L=late"
    );
    Ok(output)
}

fn status_mark(status: SleepStatus) -> char {
    match status {
        SleepStatus::Excellent => 'E',
        SleepStatus::Good => 'G',
        SleepStatus::Average => 'A',
        SleepStatus::Poor => 'P',
        SleepStatus::VeryPoor => 'V',
        SleepStatus::Late => 'L',
    }
}
