//! Core domain types
//!
//! These types represent the simulation manager records the monitor
//! observes, and the local snapshot pair it keeps to compute updates.

pub mod record;
