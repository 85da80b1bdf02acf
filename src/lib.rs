//! hookrelay — Slack approval relay library.
//!
//! This library exposes the relay's components for the two binaries
//! (`hookrelay` and `hookrelay-hook`) and for integration testing.

pub mod approval;
pub mod cli;
pub mod config;
pub mod listener;
pub mod slack;
pub mod store;
