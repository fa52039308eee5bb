#![forbid(unsafe_code)]

use std::io;

use chrono::{Local, Utc};

use crate::api::types::Task;

const HEADERS: [&str; 7] = ["ID", "DONE", "PRI", "TITLE", "DUE", "RECUR", "TAGS"];

/// Column-aligned task listing for the terminal, with a CSV twin for
/// scripting. Rows are emitted in store order; callers filter, this never
/// sorts.
#[derive(Debug, Default)]
pub struct TaskTable {
    rows: Vec<[String; 7]>,
}

impl TaskTable {
    #[must_use]
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let now = Utc::now();
        let mut table = Self::default();
        for task in tasks {
            table.rows.push(render_row(task, now));
        }
        table
    }

    pub fn print(&self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        self.write_text(&mut out)
    }

    pub fn print_csv(&self) -> io::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout().lock());
        wtr.write_record(HEADERS)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_text(&self, mut out: impl io::Write) -> io::Result<()> {
        let mut widths: [usize; 7] = [0; 7];
        for (i, h) in HEADERS.iter().enumerate() {
            widths[i] = h.chars().count();
        }
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        write_padded(&mut out, HEADERS.iter().map(|h| (*h).to_owned()), &widths)?;
        for row in &self.rows {
            write_padded(&mut out, row.iter().cloned(), &widths)?;
        }
        Ok(())
    }
}

fn write_padded(
    out: &mut impl io::Write,
    cells: impl Iterator<Item = String>,
    widths: &[usize; 7],
) -> io::Result<()> {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            line.push_str("  ");
        }
        let pad = widths[i].saturating_sub(cell.chars().count());
        line.push_str(&cell);
        for _ in 0..pad {
            line.push(' ');
        }
    }
    writeln!(out, "{}", line.trim_end())
}

fn render_row(task: &Task, now: chrono::DateTime<Utc>) -> [String; 7] {
    let done = if task.completed { "x" } else { "-" };
    let due = task
        .due()
        .map(|d| {
            let local = d.with_timezone(&Local).format("%Y-%m-%d %H:%M");
            if task.is_overdue(now) {
                format!("{local} !")
            } else {
                local.to_string()
            }
        })
        .unwrap_or_default();
    let recur = task
        .recurring_rule
        .map(|r| r.as_str().to_owned())
        .unwrap_or_default();
    [
        task.id.to_string(),
        done.to_owned(),
        task.priority.as_str().to_owned(),
        task.title.clone(),
        due,
        recur,
        task.tags.clone().unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Priority, RecurringRule};

    fn sample(id: i64, title: &str) -> Task {
        Task {
            id,
            user_id: "u1".to_owned(),
            title: title.to_owned(),
            description: String::new(),
            priority: Priority::High,
            tags: Some("work".to_owned()),
            due_date: None,
            recurring_rule: Some(RecurringRule::Weekly),
            completed: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn rows_follow_input_order() {
        let a = sample(2, "second");
        let b = sample(1, "first");
        let table = TaskTable::from_tasks([&a, &b]);
        let mut buf = Vec::new();
        table.write_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].starts_with('2'));
        assert!(lines[2].starts_with('1'));
        assert!(lines[1].contains("second"));
        assert!(lines[1].contains("weekly"));
        assert!(lines[1].contains("high"));
    }
}
