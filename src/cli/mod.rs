//! Command-line interface
//!
//! Argument definitions, command handlers, and terminal rendering of engine
//! events for the `stillwater` binary.

pub mod args;
pub mod commands;
pub mod render;
