//! Configuration module for retext-core
//!
//! This module handles user preferences read by the interpretation core,
//! including serialization to/from JSON and persistent storage in the
//! platform-specific config directory.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
