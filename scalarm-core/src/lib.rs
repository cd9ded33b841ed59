//! Scalarm Core
//!
//! Core types for the Scalarm monitoring client.
//!
//! This crate contains:
//! - Domain types: simulation manager records and their sync state
//! - DTOs: response envelopes returned by the experiment manager
//! - Diff encoding: the minimal update payload pushed back to the service

pub mod diff;
pub mod domain;
pub mod dto;
