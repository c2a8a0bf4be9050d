//! Shared library surface for the windsock server binaries and tests.

pub mod api;
pub mod backoff;
pub mod config;
pub mod loops;
pub mod persistence;
pub mod state;
