#![forbid(unsafe_code)]

//! Client-held task state and the rules that keep it consistent with the
//! server under latency and failure.
//!
//! The discipline, per mutation type: creates are never inserted
//! speculatively (the id is server-assigned); updates and toggles replace
//! the record in place with the server's response verbatim; deletes are
//! applied only after confirmation. List order is whatever the server
//! returned; the store never re-sorts.

use crate::api::types::{ChatReply, Task};

/// Ticket for one logical reload. Results are applied only while their
/// ticket is still the latest issued, which neutralizes stale responses
/// from superseded fetches without actual cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadTicket(u64);

/// What a toggle response means for the rest of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// In-place replacement only; nothing else changed server-side.
    Replaced,
    /// The server spawned the next recurrence; a full refetch is required
    /// to see it.
    ReplacedNeedsReload,
    /// The response id is not in the store; refetch rather than guess.
    UnknownNeedsReload,
}

impl ToggleOutcome {
    #[must_use]
    pub fn needs_reload(self) -> bool {
        !matches!(self, Self::Replaced)
    }
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    issued: u64,
}

impl TaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[must_use]
    pub fn pending(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.completed).collect()
    }

    #[must_use]
    pub fn completed(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.completed).collect()
    }

    /// Start a reload and invalidate every ticket issued before it.
    pub fn begin_reload(&mut self) -> ReloadTicket {
        self.issued += 1;
        ReloadTicket(self.issued)
    }

    /// Apply a finished reload. Returns false (and changes nothing) when a
    /// newer reload was issued while this one was in flight.
    pub fn commit_reload(&mut self, ticket: ReloadTicket, tasks: Vec<Task>) -> bool {
        if ticket.0 != self.issued {
            tracing::debug!(ticket = ticket.0, latest = self.issued, "dropping stale reload");
            return false;
        }
        self.tasks = tasks;
        true
    }

    /// Append a server-confirmed creation. Nothing is ever inserted before
    /// the server has assigned the id.
    pub fn insert_created(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Replace the matching record with the server's response. Returns false
    /// when the id is unknown, in which case the caller should reload rather
    /// than append a record it never listed.
    pub fn apply_update(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub fn apply_toggle(&mut self, task: Task) -> ToggleOutcome {
        let spawns = task.spawns_successor();
        if !self.apply_update(task) {
            return ToggleOutcome::UnknownNeedsReload;
        }
        if spawns {
            tracing::debug!("recurring task completed; list refetch required");
            ToggleOutcome::ReplacedNeedsReload
        } else {
            ToggleOutcome::Replaced
        }
    }

    /// Remove a server-confirmed deletion. Only the exact id is touched; a
    /// confirmed id that is not held is a no-op.
    pub fn apply_delete(&mut self, id: i64) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Transcript of one chat session. The user turn is appended optimistically
/// before the request for responsiveness; a failed send rolls back exactly
/// that turn and hands the text back so the input can be restored.
#[derive(Debug, Default)]
pub struct ChatLog {
    turns: Vec<ChatTurn>,
    conversation: Option<i64>,
}

impl ChatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The id to echo on the next send; None until the backend replies once.
    #[must_use]
    pub fn conversation(&self) -> Option<i64> {
        self.conversation
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn {
            role: Role::User,
            content: content.into(),
        });
    }

    pub fn commit_reply(&mut self, reply: &ChatReply) {
        self.conversation = Some(reply.conversation_id);
        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content: reply.response.clone(),
        });
    }

    /// Undo the optimistic append after a failed send. Returns the original
    /// text so the caller can put it back in the input field. Removes only a
    /// trailing user turn; anything else is left alone.
    pub fn rollback_send(&mut self) -> Option<String> {
        if self.turns.last().map(|t| t.role) == Some(Role::User) {
            return self.turns.pop().map(|t| t.content);
        }
        None
    }

    /// Start a new chat session: discard the transcript and the
    /// conversation id (the next send passes null).
    pub fn reset(&mut self) {
        self.turns.clear();
        self.conversation = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Priority, RecurringRule};

    fn task(id: i64, title: &str) -> Task {
        Task {
            id,
            user_id: "u1".to_owned(),
            title: title.to_owned(),
            description: String::new(),
            priority: Priority::Medium,
            tags: None,
            due_date: None,
            recurring_rule: None,
            completed: false,
            created_at: "2026-08-01T00:00:00".to_owned(),
            updated_at: "2026-08-01T00:00:00".to_owned(),
        }
    }

    #[test]
    fn reload_preserves_server_order() {
        let mut store = TaskStore::new();
        let ticket = store.begin_reload();
        // Deliberately not sorted by id.
        let listed = vec![task(3, "c"), task(1, "a"), task(2, "b")];
        assert!(store.commit_reload(ticket, listed));
        let ids: Vec<i64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn stale_reload_is_dropped() {
        let mut store = TaskStore::new();
        let first = store.begin_reload();
        let second = store.begin_reload();
        assert!(!store.commit_reload(first, vec![task(1, "stale")]));
        assert!(store.is_empty());
        assert!(store.commit_reload(second, vec![task(2, "fresh")]));
        assert_eq!(store.tasks()[0].id, 2);
    }

    #[test]
    fn created_tasks_append_in_confirmation_order() {
        let mut store = TaskStore::new();
        store.insert_created(task(10, "first"));
        store.insert_created(task(11, "second"));
        let ids: Vec<i64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn update_replaces_in_place_without_reordering() {
        let mut store = TaskStore::new();
        let ticket = store.begin_reload();
        store.commit_reload(ticket, vec![task(1, "a"), task(2, "b"), task(3, "c")]);

        let mut edited = task(2, "b edited");
        edited.updated_at = "2026-08-02T00:00:00".to_owned();
        assert!(store.apply_update(edited));

        let ids: Vec<i64> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.get(2).unwrap().title, "b edited");
    }

    #[test]
    fn update_for_unknown_id_changes_nothing() {
        let mut store = TaskStore::new();
        store.insert_created(task(1, "a"));
        assert!(!store.apply_update(task(99, "ghost")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn non_recurring_toggle_needs_no_reload() {
        let mut store = TaskStore::new();
        store.insert_created(task(3, "one-off"));

        let mut toggled = task(3, "one-off");
        toggled.completed = true;
        assert_eq!(store.apply_toggle(toggled), ToggleOutcome::Replaced);
        assert!(store.get(3).unwrap().completed);
    }

    #[test]
    fn completing_a_daily_task_demands_a_refetch() {
        let mut store = TaskStore::new();
        let mut daily = task(5, "water plants");
        daily.recurring_rule = Some(RecurringRule::Daily);
        store.insert_created(daily.clone());

        daily.completed = true;
        let outcome = store.apply_toggle(daily);
        assert_eq!(outcome, ToggleOutcome::ReplacedNeedsReload);
        assert!(outcome.needs_reload());
    }

    #[test]
    fn uncompleting_a_recurring_task_needs_no_reload() {
        let mut store = TaskStore::new();
        let mut weekly = task(6, "report");
        weekly.recurring_rule = Some(RecurringRule::Weekly);
        weekly.completed = true;
        store.insert_created(weekly.clone());

        weekly.completed = false;
        assert_eq!(store.apply_toggle(weekly), ToggleOutcome::Replaced);
    }

    #[test]
    fn delete_touches_only_the_exact_id() {
        let mut store = TaskStore::new();
        store.insert_created(task(1, "a"));
        store.insert_created(task(2, "b"));

        assert!(store.apply_delete(99).is_none());
        assert_eq!(store.len(), 2);

        let removed = store.apply_delete(1).unwrap();
        assert_eq!(removed.id, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].id, 2);
    }

    #[test]
    fn pending_and_completed_views_keep_store_order() {
        let mut store = TaskStore::new();
        let mut done = task(1, "done");
        done.completed = true;
        store.insert_created(task(2, "open a"));
        store.insert_created(done);
        store.insert_created(task(3, "open b"));

        let pending: Vec<i64> = store.pending().iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![2, 3]);
        let completed: Vec<i64> = store.completed().iter().map(|t| t.id).collect();
        assert_eq!(completed, vec![1]);
    }

    #[test]
    fn failed_send_rolls_back_exactly_one_user_turn() {
        let mut chat = ChatLog::new();
        chat.push_user("add a task");
        chat.commit_reply(&ChatReply {
            conversation_id: 7,
            response: "Done!".to_owned(),
            tool_calls: Vec::new(),
        });
        chat.push_user("what did I just add?");

        let restored = chat.rollback_send();
        assert_eq!(restored.as_deref(), Some("what did I just add?"));
        assert_eq!(chat.turns().len(), 2);
        // Conversation id survives a failed send.
        assert_eq!(chat.conversation(), Some(7));

        // Trailing assistant turn is never rolled back.
        assert!(chat.rollback_send().is_none());
        assert_eq!(chat.turns().len(), 2);
    }

    #[test]
    fn reset_discards_transcript_and_conversation() {
        let mut chat = ChatLog::new();
        chat.push_user("hi");
        chat.commit_reply(&ChatReply {
            conversation_id: 1,
            response: "hello".to_owned(),
            tool_calls: Vec::new(),
        });
        chat.reset();
        assert!(chat.turns().is_empty());
        assert_eq!(chat.conversation(), None);
    }
}
