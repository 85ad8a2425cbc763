//! AI-assisted task entry.
//!
//! Sends a freeform request together with the current tags, date and
//! in-window tasks to an OpenAI-compatible chat-completions endpoint, and
//! parses the reply through a line-oriented mini-format: records introduced
//! by `Task:` lines, with `Tag:`, `Duration:` and `Date:` fields attached
//! until the next `Task:` line. That format is the entire contract with the
//! model; unrecognised lines are silently ignored.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::Store;
use crate::tags::TagRegistry;
use crate::task::NewTask;

/// Errors from the assist subsystem.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("no API key configured; set WEEKPLAN_API_KEY or OPENAI_API_KEY")]
    MissingApiKey,
    #[error("assist request failed: {message}")]
    Request { message: String },
    #[error("failed to parse assist response: {message}")]
    Parse { message: String },
}

/// Configuration for the assist endpoint, read from the environment.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Bearer token, if the endpoint needs one.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        AssistConfig {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl AssistConfig {
    /// Build a configuration from `WEEKPLAN_API_URL`, `WEEKPLAN_MODEL` and
    /// `WEEKPLAN_API_KEY` (falling back to `OPENAI_API_KEY`).
    pub fn from_env() -> Self {
        let mut config = AssistConfig::default();
        if let Ok(url) = std::env::var("WEEKPLAN_API_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = std::env::var("WEEKPLAN_MODEL") {
            config.model = model;
        }
        config.api_key = std::env::var("WEEKPLAN_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok();
        config
    }
}

/// One task record parsed from an assist response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub title: String,
    pub tag: Option<String>,
    pub duration: u32,
    /// `None` falls back to the caller-supplied current date.
    pub date: Option<NaiveDate>,
}

/// System instruction fixing the line-oriented response format.
const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates tasks based on user input. \
For each task, provide a Task:, a Tag:, a Duration: (in minutes), and a Date: (in YYYY-MM-DD format) \
on separate lines. Use tags from the provided list or suggest new ones if necessary.";

/// Default duration for records without a parsable `Duration:` line.
const DEFAULT_DURATION_MIN: u32 = 30;

/// Synchronous client for the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct AssistClient {
    config: AssistConfig,
}

impl AssistClient {
    pub fn new(config: AssistConfig) -> Self {
        AssistClient { config }
    }

    /// Compose the user message carrying the request and planner context.
    pub fn user_message(
        input: &str,
        tags: &[String],
        current_date: NaiveDate,
        relevant_tasks_json: &str,
    ) -> String {
        format!(
            "Create tasks based on this input: \"{}\". Current tags: {}. Current date: {}. Relevant tasks: {}",
            input,
            tags.join(", "),
            current_date,
            relevant_tasks_json
        )
    }

    /// Send the request and return the raw completion text.
    pub fn complete(
        &self,
        input: &str,
        tags: &[String],
        current_date: NaiveDate,
        relevant_tasks_json: &str,
    ) -> Result<String, AssistError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(AssistError::MissingApiKey);
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": Self::user_message(input, tags, current_date, relevant_tasks_json),
                },
            ],
        });

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_string(&body.to_string())
            .map_err(|e: ureq::Error| AssistError::Request {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| AssistError::Parse {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| AssistError::Parse {
                message: e.to_string(),
            })?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AssistError::Parse {
                message: "missing message content".into(),
            })
    }
}

/// JSON dump of the five-day window's tasks, sent as model context.
pub fn relevant_tasks_json(store: &Store, today: NaiveDate) -> String {
    let tasks: Vec<_> = store
        .tasks_in_window(today, 5)
        .into_iter()
        .map(|(_, t)| t)
        .collect();
    serde_json::to_string(&tasks).unwrap_or_else(|_| "[]".into())
}

/// Parse a completion into task records.
///
/// A `Task:` line opens a record; `Tag:`, `Duration:` and `Date:` lines
/// attach to the open record. Field lines before the first `Task:` and any
/// unrecognised lines are ignored. A response with no `Task:` lines parses
/// to an empty list, which is not an error.
pub fn parse_planned(response: &str) -> Vec<PlannedTask> {
    let mut planned = Vec::new();
    let mut current: Option<PlannedTask> = None;

    for line in response.lines() {
        if let Some(title) = line.strip_prefix("Task:") {
            if let Some(task) = current.take() {
                planned.push(task);
            }
            current = Some(PlannedTask {
                title: title.trim().to_string(),
                tag: None,
                duration: DEFAULT_DURATION_MIN,
                date: None,
            });
        } else if let Some(tag) = line.strip_prefix("Tag:") {
            if let Some(task) = current.as_mut() {
                let tag = tag.trim();
                task.tag = (!tag.is_empty()).then(|| tag.to_string());
            }
        } else if let Some(duration) = line.strip_prefix("Duration:") {
            if let Some(task) = current.as_mut() {
                task.duration = parse_leading_u32(duration).unwrap_or(DEFAULT_DURATION_MIN);
            }
        } else if let Some(date) = line.strip_prefix("Date:") {
            if let Some(task) = current.as_mut() {
                task.date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok();
            }
        }
    }

    if let Some(task) = current {
        planned.push(task);
    }
    planned
}

/// Leading-integer parse, tolerating trailing text like "45 minutes".
/// Durations must be positive, so zero parses as `None`.
fn parse_leading_u32(s: &str) -> Option<u32> {
    let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|&n| n > 0)
}

/// Insert planned tasks into the store, registering any unseen tag.
/// Returns the ids actually created (blank titles are dropped by `add`).
pub fn apply_planned(
    store: &mut Store,
    registry: &mut TagRegistry,
    planned: &[PlannedTask],
    current_date: NaiveDate,
) -> Vec<u64> {
    let mut ids = Vec::new();
    for task in planned {
        if let Some(tag) = &task.tag {
            registry.ensure_tag(tag);
        }
        let date = task.date.unwrap_or(current_date);
        if let Some(id) = store.add(
            date,
            NewTask {
                title: task.title.clone(),
                tag: task.tag.clone(),
                duration: task.duration,
            },
        ) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_two_records_with_defaults_for_missing_fields() {
        let response = "Task: Call investor\nTag: Fundraising\nDuration: 45\nDate: 2024-03-02\nTask: Send invoice\nTag: Finance";
        let planned = parse_planned(response);
        assert_eq!(
            planned,
            vec![
                PlannedTask {
                    title: "Call investor".into(),
                    tag: Some("Fundraising".into()),
                    duration: 45,
                    date: Some(day("2024-03-02")),
                },
                PlannedTask {
                    title: "Send invoice".into(),
                    tag: Some("Finance".into()),
                    duration: 30,
                    date: None,
                },
            ]
        );
    }

    #[test]
    fn response_without_task_lines_parses_to_nothing() {
        assert!(parse_planned("").is_empty());
        assert!(parse_planned("Sure! Here are your tasks.").is_empty());
        // Field lines before the first Task: are ignored.
        assert!(parse_planned("Tag: Sales\nDuration: 45").is_empty());
    }

    #[test]
    fn unparsable_duration_defaults_to_thirty() {
        let planned = parse_planned("Task: a\nDuration: soonish");
        assert_eq!(planned[0].duration, 30);
        let planned = parse_planned("Task: a\nDuration: 45 minutes");
        assert_eq!(planned[0].duration, 45);
    }

    #[test]
    fn zero_duration_defaults_to_thirty() {
        let planned = parse_planned("Task: a\nDuration: 0");
        assert_eq!(planned[0].duration, 30);
        let planned = parse_planned("Task: a\nDuration: 0 minutes");
        assert_eq!(planned[0].duration, 30);
    }

    #[test]
    fn unparsable_date_falls_back_to_none() {
        let planned = parse_planned("Task: a\nDate: next tuesday-ish");
        assert_eq!(planned[0].date, None);
    }

    #[test]
    fn unknown_lines_are_ignored_between_fields() {
        let response = "Here you go:\nTask: a\nnote to self\nTag: Sales\n- bullet\nDuration: 20";
        let planned = parse_planned(response);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].tag.as_deref(), Some("Sales"));
        assert_eq!(planned[0].duration, 20);
    }

    #[test]
    fn user_message_carries_tags_date_and_context() {
        let msg = AssistClient::user_message(
            "plan my friday",
            &["Admin".into(), "Sales".into()],
            day("2024-03-01"),
            "[]",
        );
        assert!(msg.contains("\"plan my friday\""));
        assert!(msg.contains("Admin, Sales"));
        assert!(msg.contains("2024-03-01"));
        assert!(msg.ends_with("Relevant tasks: []"));
    }

    #[test]
    fn apply_planned_registers_unseen_tags_and_uses_fallback_date() {
        let mut store = Store::default();
        let mut registry = TagRegistry {
            tags: vec!["Admin".into()],
            objectives: Default::default(),
            focus_count: 1,
        };
        let planned = vec![
            PlannedTask {
                title: "Call investor".into(),
                tag: Some("Fundraising".into()),
                duration: 45,
                date: Some(day("2024-03-02")),
            },
            PlannedTask {
                title: "Send invoice".into(),
                tag: None,
                duration: 30,
                date: None,
            },
        ];
        let ids = apply_planned(&mut store, &mut registry, &planned, day("2024-03-01"));
        assert_eq!(ids.len(), 2);
        assert_eq!(registry.tags, ["Admin", "Fundraising"]);
        assert_eq!(store.bucket(day("2024-03-02"))[0].title, "Call investor");
        assert_eq!(store.bucket(day("2024-03-01"))[0].title, "Send invoice");
    }

    #[test]
    fn complete_without_api_key_errors_cleanly() {
        let client = AssistClient::new(AssistConfig {
            api_key: None,
            ..Default::default()
        });
        let err = client
            .complete("x", &[], day("2024-03-01"), "[]")
            .unwrap_err();
        assert!(matches!(err, AssistError::MissingApiKey));
    }
}
