#![forbid(unsafe_code)]

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => anyhow::bail!("invalid priority '{other}': expected low|medium|high"),
        }
    }

    #[must_use]
    pub fn cycle(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurringRule {
    Daily,
    Weekly,
    Monthly,
}

impl RecurringRule {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => anyhow::bail!("invalid recurring rule '{other}': expected daily|weekly|monthly"),
        }
    }

    /// None advances to Daily, Monthly wraps back to one-time.
    #[must_use]
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::Daily),
            Some(Self::Daily) => Some(Self::Weekly),
            Some(Self::Weekly) => Some(Self::Monthly),
            Some(Self::Monthly) => None,
        }
    }
}

/// A task record as the backend returns it. `id` and `user_id` are
/// server-assigned and never change; the client never invents either.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub recurring_rule: Option<RecurringRule>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Task {
    /// True when completing this record made the server create the next
    /// recurrence, so the local list is stale until a full refetch.
    #[must_use]
    pub fn spawns_successor(&self) -> bool {
        self.completed && self.recurring_rule.is_some()
    }

    #[must_use]
    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(parse_timestamp)
    }

    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due().is_some_and(|d| d < now)
    }

    /// Split the comma-separated tag string into trimmed labels.
    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// The backend normalizes timestamps to UTC but may emit them without an
/// offset suffix, so fall back to naive-as-UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Creation body. Optional fields are omitted from the JSON entirely so the
/// server applies its own defaults.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_rule: Option<RecurringRule>,
}

/// Partial update body; omitted fields are left unchanged server-side.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_rule: Option<RecurringRule>,
}

impl TaskPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.due_date.is_none()
            && self.recurring_rule.is_none()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DeleteAck {
    pub ok: bool,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatReply {
    pub conversation_id: i64,
    pub response: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ToolCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_defaults_fill_missing_fields() {
        let task: Task = serde_json::from_str(
            r#"{"id":1,"user_id":"u1","title":"Buy milk","description":"",
                "completed":false,"created_at":"2026-01-02T03:04:05","updated_at":"2026-01-02T03:04:05"}"#,
        )
        .unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.tags.is_none());
        assert!(task.due_date.is_none());
        assert!(task.recurring_rule.is_none());
        assert!(!task.spawns_successor());
    }

    #[test]
    fn new_task_omits_absent_fields() {
        let body = serde_json::to_value(NewTask {
            title: "Buy milk".to_owned(),
            ..NewTask::default()
        })
        .unwrap();
        let obj = body.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("title"));
        assert!(obj.contains_key("description"));
    }

    #[test]
    fn patch_omits_untouched_fields() {
        let patch = TaskPatch {
            title: Some("New title".to_owned()),
            ..TaskPatch::default()
        };
        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(body.as_object().unwrap().len(), 1);
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn timestamps_parse_with_and_without_offset() {
        assert!(parse_timestamp("2026-08-30T12:00:00Z").is_some());
        assert!(parse_timestamp("2026-08-30T12:00:00.123456").is_some());
        assert!(parse_timestamp("2026-08-30T12:00:00").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn recurring_completion_flags_successor() {
        let task = Task {
            id: 3,
            user_id: "u1".to_owned(),
            title: "Water plants".to_owned(),
            description: String::new(),
            priority: Priority::Low,
            tags: None,
            due_date: None,
            recurring_rule: Some(RecurringRule::Daily),
            completed: true,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(task.spawns_successor());
    }

    #[test]
    fn tag_list_splits_and_trims() {
        let task = Task {
            id: 1,
            user_id: "u1".to_owned(),
            title: "t".to_owned(),
            description: String::new(),
            priority: Priority::Medium,
            tags: Some(" work , urgent ,, ".to_owned()),
            due_date: None,
            recurring_rule: None,
            completed: false,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(task.tag_list(), vec!["work", "urgent"]);
    }
}
