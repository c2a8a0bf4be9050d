//! Background loops for continuous processing.

pub mod collect_loop;
pub mod decision_loop;
