#![forbid(unsafe_code)]

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{ChatReply, DeleteAck, NewTask, Priority, RecurringRule, Task, TaskPatch, ToolCall};
