//! Service layer
//!
//! Services hold the monitor's decisions about individual records. They
//! are trait-based so the poller can be driven by test doubles.

mod handler;

// Re-export traits
pub use handler::RecordHandler;

// Re-export implementations
pub use handler::LoggingHandler;
