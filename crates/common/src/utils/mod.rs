//! Common utility helpers
//!
//! - **[`serde`]**: Serialization helpers for durations in configuration

pub mod serde;

// Re-export commonly used items for convenience
pub use self::serde::{duration_millis, duration_secs, option_duration_millis};
