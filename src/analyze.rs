use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::SleepRecord;

/// Notes shorter than this carry too little signal to analyze.
pub const MIN_NOTE_CHARS: usize = 10;

const DEFAULT_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const DEFAULT_MODEL: &str = "glm-4";

const DAILY_SYSTEM_PROMPT: &str = "你是一个专业的睡眠健康分析师。请分析用户提供的睡眠备注，识别失眠模式、潜在原因和改进建议。\n分析要点：\n1. 识别睡眠问题类型（入睡困难、夜间醒来、早醒等）\n2. 分析可能的原因（压力、生活习惯、环境因素等）\n3. 提供具体的改进建议\n4. 用中文回复，保持专业但友好的语气\n5. 格式：先总结问题，再分析原因，最后给建议";

const MONTHLY_SYSTEM_PROMPT: &str = "你是一个专业的睡眠健康分析师。请分析用户提供的月度睡眠记录，识别睡眠模式、常见问题和改进建议。\n\n分析要点：\n1. 识别重复出现的睡眠问题模式（如：因第二天有重要事情导致的失眠、周末熬夜等）\n2. 统计各类问题的出现频率和规律\n3. 分析潜在的根本原因\n4. 提供针对性的改进建议\n5. 用中文回复，保持专业但友好的语气\n\n回复格式要求：\n- 先总结本月睡眠模式的整体特点\n- 然后分类统计各类问题的出现情况\n- 接着分析可能的原因\n- 最后提供具体的改进建议\n- 使用清晰的结构和具体的数字说明";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Monthly analysis text plus how many records actually fed into it.
#[derive(Debug, Clone)]
pub struct MonthlyAnalysis {
    pub analysis: String,
    pub records_analyzed: i32,
}

/// Client for the chat-completions endpoint that produces analysis text.
pub struct CompletionClient {
    api_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl CompletionClient {
    /// Reads `SLEEP_API_KEY` (required) and the optional `SLEEP_API_URL` /
    /// `SLEEP_MODEL` overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("SLEEP_API_KEY")
            .context("SLEEP_API_KEY must be set to call the analysis API")?;
        let api_url = std::env::var("SLEEP_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let model = std::env::var("SLEEP_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_url,
            api_key,
            model,
            http,
        })
    }

    /// Analyze one day's note. Rejects notes under [`MIN_NOTE_CHARS`] before
    /// any network traffic.
    pub async fn analyze_note(&self, date: NaiveDate, note: &str) -> anyhow::Result<String> {
        if !note_long_enough(note) {
            bail!("备注内容过短，无法进行有效分析");
        }

        let user = format!(
            "请分析以下睡眠记录：\n日期：{date}\n备注内容：{}\n\n请从专业角度分析这个睡眠情况。",
            note.trim()
        );
        self.complete(DAILY_SYSTEM_PROMPT, user, 0.7, 1000).await
    }

    /// Analyze a month of records as one aggregate. Records with notes under
    /// the minimum length are skipped; it is an error when none remain.
    pub async fn analyze_month(
        &self,
        records: &[SleepRecord],
    ) -> anyhow::Result<MonthlyAnalysis> {
        if records.is_empty() {
            bail!("没有可分析的记录");
        }

        let valid = analyzable_records(records);
        if valid.is_empty() {
            bail!("备注内容过短，无法进行有效分析");
        }

        let user = format!(
            "请综合分析以下月度睡眠记录，识别睡眠模式和问题：\n\n{}\n\n请从专业角度分析这些睡眠记录，识别重复出现的模式，并提供有针对性的建议。",
            monthly_notes_summary(&valid)
        );

        log::debug!("requesting monthly analysis for {} records", valid.len());
        let analysis = self.complete(MONTHLY_SYSTEM_PROMPT, user, 0.7, 1500).await?;

        Ok(MonthlyAnalysis {
            analysis,
            records_analyzed: valid.len() as i32,
        })
    }

    async fn complete(
        &self,
        system: &'static str,
        user: String,
        temperature: f32,
        max_tokens: u32,
    ) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to reach completion API at {}", self.api_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("completion API returned {status}: {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to parse completion response")?;

        match parsed.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content),
            None => bail!("completion response contained no choices"),
        }
    }
}

pub fn note_long_enough(note: &str) -> bool {
    note.trim().chars().count() >= MIN_NOTE_CHARS
}

fn analyzable_records(records: &[SleepRecord]) -> Vec<&SleepRecord> {
    records
        .iter()
        .filter(|r| note_long_enough(&r.note))
        .collect()
}

/// One line per record, the way the aggregate prompt expects them.
fn monthly_notes_summary(records: &[&SleepRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "日期：{}，睡眠状况：{}，备注：{}",
                r.date,
                r.status.label(),
                r.note
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SleepStatus;
    use chrono::{NaiveDate, Utc};

    fn record(day: u32, status: SleepStatus, note: &str) -> SleepRecord {
        SleepRecord {
            date: NaiveDate::from_ymd_opt(2026, 8, day).unwrap(),
            status,
            note: note.to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn note_length_gate_counts_chars_not_bytes() {
        assert!(!note_long_enough("太短了"));
        assert!(!note_long_enough("  九个字符的备注不够  "));
        assert!(note_long_enough("昨晚因为开会准备到很晚才睡"));
    }

    #[test]
    fn short_noted_records_are_skipped_for_monthly_analysis() {
        let records = vec![
            record(1, SleepStatus::Poor, "凌晨两点才睡着，白天一直犯困"),
            record(2, SleepStatus::Good, "还行"),
        ];
        let valid = analyzable_records(&records);
        assert_eq!(valid.len(), 1);
        assert!(valid[0].note.contains("凌晨"));
    }

    #[test]
    fn monthly_summary_lists_date_status_and_note() {
        let records = vec![record(5, SleepStatus::Late, "追剧到一点，第二天早起开会")];
        let valid = analyzable_records(&records);
        let summary = monthly_notes_summary(&valid);
        assert!(summary.contains("日期：2026-08-05"));
        assert!(summary.contains("睡眠状况：晚睡"));
        assert!(summary.contains("备注：追剧到一点"));
    }

    #[test]
    fn chat_request_serializes_expected_fields() {
        let request = ChatRequest {
            model: "glm-4".into(),
            messages: vec![ChatMessage {
                role: "system",
                content: "提示".into(),
            }],
            temperature: 0.7,
            max_tokens: 1000,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "glm-4");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["max_tokens"], 1000);
    }

    #[test]
    fn empty_choices_cannot_be_deserialized_as_content() {
        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }
}
