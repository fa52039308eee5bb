#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod output;
pub mod session;
pub mod store;
pub mod tui;
