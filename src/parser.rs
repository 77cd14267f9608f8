//! Heuristic extraction of structure from freeform LLM sleep-analysis text.
//!
//! The model replies in loosely sectioned Chinese prose. This scanner walks
//! the reply line by line, tracking which section the text is currently in,
//! and pulls out pattern lines, problem frequencies, and suggestions. It is a
//! display aid only: on garbage input every field degrades to empty instead
//! of failing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Disruption phrases the model tends to echo back when it names a pattern.
const SLEEP_PATTERNS: [&str; 14] = [
    "第二天有重要事情",
    "早起",
    "重要会议",
    "考试",
    "工作压力",
    "周末熬夜",
    "作息不规律",
    "睡前使用电子设备",
    "咖啡因",
    "环境噪音",
    "温度不适",
    "焦虑",
    "压力",
    "饮食习惯",
];

const SUMMARY_KEYWORDS: [&str; 3] = ["总结", "整体特点", "本月睡眠"];
const PATTERN_KEYWORDS: [&str; 3] = ["模式", "问题", "原因"];
const FREQUENCY_KEYWORDS: [&str; 3] = ["频率", "统计", "出现"];
const SUGGESTION_KEYWORDS: [&str; 3] = ["建议", "改进", "措施"];

static FREQUENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)次|(\d+)回|出现(\d+)次|频率为(\d+)").unwrap());

/// Problem fragment: shortest run of non-punctuation ending right before a
/// frequency/total keyword or a sentence-terminal punctuation mark.
static PROBLEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^，。！？；：]+?)(?:出现|频率|共|总计|[，。！？；：])").unwrap()
});

static SUGGESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"建议|改进|措施|方法|解决方案|可以|应该|推荐").unwrap());

/// Leading enumeration marker ("1、", "2.", "- ", ...).
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d、.\-]*\s*").unwrap());

static ENUMERATED_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d、.\-•]\s+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Summary,
    Patterns,
    Frequency,
    Suggestions,
}

/// Structured view of one analysis reply. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ParsedReport {
    pub summary: String,
    pub patterns: Vec<String>,
    pub frequencies: HashMap<String, u32>,
    pub suggestions: Vec<String>,
}

/// Pure function of the input text; identical input yields identical output.
pub fn parse_report(text: &str) -> ParsedReport {
    let mut report = ParsedReport::default();

    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    // Summary: everything before the first blank line, or the whole text.
    let first_paragraph = match text.split("\n\n").next() {
        Some(p) if !p.is_empty() => p,
        _ => text,
    };
    report.summary = MARKER_RE.replace(first_paragraph, "").trim().to_string();

    let mut section = Section::None;

    for line in &lines {
        section = next_section(section, line);

        match section {
            Section::Patterns => {
                let matched = SLEEP_PATTERNS.iter().any(|p| line.contains(p));
                if matched && char_len(line) > 10 {
                    report.patterns.push((*line).to_string());
                }
            }
            Section::Frequency => {
                for caps in FREQUENCY_RE.captures_iter(line) {
                    let count = (1..=4)
                        .find_map(|i| caps.get(i))
                        .and_then(|m| m.as_str().parse::<u32>().ok());
                    let Some(count) = count.filter(|&c| c != 0) else {
                        continue;
                    };
                    if let Some(problem) = PROBLEM_RE.captures(line) {
                        let key = problem[1].trim().to_string();
                        // Same key on repeated mentions: last count wins.
                        report.frequencies.insert(key, count);
                    }
                }
            }
            Section::Suggestions => {
                if char_len(line) > 15 && SUGGESTION_RE.is_match(line) {
                    report
                        .suggestions
                        .push(MARKER_RE.replace(line, "").to_string());
                }
            }
            Section::None | Section::Summary => {}
        }
    }

    // Fallbacks when section tagging found nothing: rescan all lines.
    if report.patterns.is_empty() {
        for pattern in SLEEP_PATTERNS {
            report.patterns.extend(
                lines
                    .iter()
                    .filter(|line| line.contains(pattern))
                    .take(3)
                    .map(|line| (*line).to_string()),
            );
        }
    }

    if report.suggestions.is_empty() {
        report.suggestions.extend(
            lines
                .iter()
                .filter(|line| ENUMERATED_LINE_RE.is_match(line) && char_len(line) > 10)
                .take(5)
                .map(|line| (*line).to_string()),
        );
    }

    report
}

/// Section transition, checked before content capture so a header line is
/// also evaluated as content for the section it switches into.
fn next_section(current: Section, line: &str) -> Section {
    if SUMMARY_KEYWORDS.iter().any(|k| line.contains(k)) {
        Section::Summary
    } else if PATTERN_KEYWORDS.iter().any(|k| line.contains(k)) {
        Section::Patterns
    } else if FREQUENCY_KEYWORDS.iter().any(|k| line.contains(k)) {
        Section::Frequency
    } else if SUGGESTION_KEYWORDS.iter().any(|k| line.contains(k)) {
        Section::Suggestions
    } else {
        current
    }
}

fn char_len(line: &str) -> usize {
    line.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "总结：本月入睡困难。\n\n模式\n因为第二天有重要事情而失眠，出现3次\n建议\n1. 建议保持规律作息，避免睡前使用电子设备";

    #[test]
    fn sample_reply_yields_all_four_sections() {
        let report = parse_report(SAMPLE);

        assert!(report.summary.contains("总结：本月入睡困难。"));
        assert!(report
            .patterns
            .iter()
            .any(|p| p.contains("因为第二天有重要事情而失眠")));
        assert!(report.frequencies.values().any(|&count| count == 3));
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.contains("建议保持规律作息")));
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse_report(SAMPLE), parse_report(SAMPLE));
    }

    #[test]
    fn empty_and_garbage_input_degrade_gracefully() {
        let empty = parse_report("");
        assert!(empty.patterns.is_empty());
        assert!(empty.frequencies.is_empty());
        assert!(empty.suggestions.is_empty());

        let garbage = parse_report("@@@@\nzzzz");
        assert!(garbage.frequencies.is_empty());
    }

    #[test]
    fn summary_defaults_to_whole_text_without_blank_line() {
        let report = parse_report("只有一行的分析结果");
        assert_eq!(report.summary, "只有一行的分析结果");
    }

    #[test]
    fn summary_strips_leading_enumeration_marker() {
        let report = parse_report("1、 总体睡眠不错\n\n其余内容");
        assert_eq!(report.summary, "总体睡眠不错");
    }

    #[test]
    fn pattern_line_under_header_is_captured_verbatim() {
        let text = "睡眠问题分析\n周末熬夜导致第二天精神不振的情况比较普遍";
        let report = parse_report(text);
        assert!(report
            .patterns
            .contains(&"周末熬夜导致第二天精神不振的情况比较普遍".to_string()));
    }

    #[test]
    fn short_pattern_lines_are_skipped() {
        // Header puts us in the patterns section; the second phrase line is
        // too short to qualify.
        let text = "睡眠问题分析\n因为工作压力大导致经常失眠难以入睡\n有点焦虑";
        let report = parse_report(text);
        assert_eq!(report.patterns.len(), 1);
        assert!(report.patterns[0].contains("工作压力"));
    }

    #[test]
    fn frequency_count_extracted_with_problem_fragment() {
        let text = "频率统计\n工作压力导致失眠，出现5次";
        let report = parse_report(text);
        assert_eq!(report.frequencies.get("工作压力导致失眠"), Some(&5));
    }

    #[test]
    fn frequency_without_numeric_match_stays_empty() {
        let report = parse_report("频率统计\n经常出现失眠的情况");
        assert!(report.frequencies.is_empty());
    }

    #[test]
    fn repeated_fragment_keeps_last_count() {
        // The key must avoid section-header keywords, or the line would
        // switch sections instead of being read as frequency content.
        let text = "频率统计\n失眠情况共2次，失眠情况共4次";
        let report = parse_report(text);
        assert_eq!(report.frequencies.len(), 1);
        assert_eq!(report.frequencies.get("失眠情况"), Some(&4));
    }

    #[test]
    fn header_keyword_mid_line_switches_away_from_frequency() {
        // 问题 is a patterns-section keyword with higher priority than the
        // frequency keywords, so this line is re-tagged and its counts are
        // never extracted.
        let report = parse_report("频率统计\n熬夜问题共2次，熬夜问题共4次");
        assert!(report.frequencies.is_empty());
    }

    #[test]
    fn suggestion_lines_are_stripped_of_markers() {
        let text = "改进建议\n2. 建议睡前一小时停止使用手机，营造安静的睡眠环境";
        let report = parse_report(text);
        assert!(report
            .suggestions
            .iter()
            .any(|s| s.starts_with("建议睡前一小时停止使用手机")));
    }

    #[test]
    fn suggestion_fallback_collects_enumerated_lines() {
        // No section headers at all, so the tagged scan collects nothing.
        let text = "- 每天固定时间上床有助于养成节律\n- 卧室温度保持在二十度上下\n- 下午之后别再喝咖啡或浓茶了";
        let report = parse_report(text);
        assert_eq!(report.suggestions.len(), 3);
        assert!(report.suggestions[0].contains("每天固定时间上床"));
    }

    #[test]
    fn suggestion_fallback_caps_at_five() {
        let text = (1..=8)
            .map(|i| format!("• 第{i}晚都在十一点前关灯上床休息了"))
            .collect::<Vec<_>>()
            .join("\n");
        let report = parse_report(&text);
        assert_eq!(report.suggestions.len(), 5);
    }

    #[test]
    fn pattern_fallback_scans_all_lines_in_catalogue_order() {
        // "说明" is not a header keyword, so no section ever activates.
        let text = "说明\n睡前使用电子设备过多\n咖啡因摄入偏晚";
        let report = parse_report(text);
        assert_eq!(
            report.patterns,
            vec![
                "睡前使用电子设备过多".to_string(),
                "咖啡因摄入偏晚".to_string()
            ]
        );
    }

    #[test]
    fn header_line_is_also_content_for_its_own_section() {
        // The line both switches to suggestions and passes the capture checks.
        let text = "建议大家保持规律作息，避免熬夜，这样第二天更有精神";
        let report = parse_report(text);
        assert!(!report.suggestions.is_empty());
    }
}
