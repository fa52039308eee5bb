#![forbid(unsafe_code)]

//! Normalizes free-text field input into the wire payloads.

use chrono::{DateTime, Local, LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::api::types::{NewTask, Priority, RecurringRule, Task, TaskPatch, parse_timestamp};

const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Field values as typed by the user. `due_local` is local wall-clock time
/// (`YYYY-MM-DD HH:MM`); conversion to UTC happens on submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: String,
    pub due_local: String,
    pub recurring: Option<RecurringRule>,
}

impl TaskDraft {
    /// Prefill for editing: the stored UTC due date is shown in local time.
    #[must_use]
    pub fn from_task(task: &Task) -> Self {
        let due_local = task
            .due()
            .map(|d| {
                d.with_timezone(&Local)
                    .format(LOCAL_FORMATS[0])
                    .to_string()
            })
            .unwrap_or_default();
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            tags: task.tags.clone().unwrap_or_default(),
            due_local,
            recurring: task.recurring_rule,
        }
    }

    pub fn to_new_task(&self) -> anyhow::Result<NewTask> {
        let title = self.title.trim();
        if title.is_empty() {
            anyhow::bail!("title is required");
        }
        Ok(NewTask {
            title: title.to_owned(),
            description: self.description.trim().to_owned(),
            priority: Some(self.priority),
            tags: normalize_tags(&self.tags),
            due_date: normalize_due(&self.due_local)?,
            recurring_rule: self.recurring,
        })
    }

    /// Full-field patch for the edit dialog. Every field the form shows is
    /// sent; the server keeps anything the form does not model.
    pub fn to_patch(&self) -> anyhow::Result<TaskPatch> {
        let title = self.title.trim();
        if title.is_empty() {
            anyhow::bail!("title is required");
        }
        Ok(TaskPatch {
            title: Some(title.to_owned()),
            description: Some(self.description.trim().to_owned()),
            priority: Some(self.priority),
            tags: normalize_tags(&self.tags),
            due_date: normalize_due(&self.due_local)?,
            recurring_rule: self.recurring,
        })
    }
}

/// Empty after trim means absent, never an empty string.
#[must_use]
pub fn normalize_tags(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Blank means no due date. Anything else must parse as local wall-clock
/// time (RFC 3339 input is also accepted) and comes back as UTC RFC 3339.
pub fn normalize_due(input: &str) -> anyhow::Result<Option<String>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let utc = parse_local(trimmed)?;
    Ok(Some(utc.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

fn parse_local(input: &str) -> anyhow::Result<DateTime<Utc>> {
    for fmt in LOCAL_FORMATS {
        let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) else {
            continue;
        };
        return match Local.from_local_datetime(&naive) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
            LocalResult::None => anyhow::bail!("due date '{input}' does not exist in local time"),
        };
    }
    // Already absolute (e.g. pasted from another task).
    if let Some(dt) = parse_timestamp(input) {
        return Ok(dt);
    }
    anyhow::bail!("invalid due date '{input}': expected YYYY-MM-DD HH:MM")
}
