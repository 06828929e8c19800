//! Configuration module for pastemark
//!
//! This module handles copy settings, including serialization to/from JSON
//! and persistent storage to platform-specific directories.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
