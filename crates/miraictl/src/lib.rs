//! Mirai Control - state file CLI for the auto-fix daemon

pub mod cli;
pub mod commands;
pub mod errors;
pub mod stats_display;
