//! Data Transfer Objects for the experiment manager API
//!
//! Wire shapes of responses that wrap domain entities.

pub mod record;
