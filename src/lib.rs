//! Genrelay: Priority Scheduling and Generation Dispatch
//!
//! A priority task queue, a registry of named generation presets, and a
//! dispatcher that routes each generation request either to an embedding
//! host's own generator or to a chat-completions relay endpoint.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod preset;
pub mod provider;
pub mod queue;
