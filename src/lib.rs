//! `stillwater` - Guided breathing and meditation session timers
//!
//! This library provides the timed session engine behind the `stillwater`
//! binary: a breathing phase cycle and a meditation countdown that share a
//! single active-run slot, driven by a pluggable timer scheduler.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod session;
pub mod timer;
