//! Windsock CLI - command line tools for the launch decision system.
//!
//! Binaries:
//! - decide: evaluate a launch once and print the verdict
//! - report_weather: push a manual reading for a station
//! - watch: keep re-evaluating a launch and report severity changes

pub mod client;

pub use client::WindsockClient;
