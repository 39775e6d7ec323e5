//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (init, show, path)
//! - [`history`] - Recorded history management (clear)
//! - [`replay`] - Drive an engine session over a recorded fix trace
//! - [`settings`] - Tracking settings (show, set)
//! - [`stats`] - Trip statistics from the stored history

pub mod common;
pub mod config;
pub mod history;
pub mod replay;
pub mod settings;
pub mod stats;
