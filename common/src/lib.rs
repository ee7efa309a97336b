//! Common code shared between `gesture_server` and `gesture_client`.
pub mod api;

/// Error type.
pub type Error = Box<dyn std::error::Error>;
