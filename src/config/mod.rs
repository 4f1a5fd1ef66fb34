//! Configuration module for In & Out
//!
//! This module provides configuration management including:
//! - Data directory resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::InoutPaths;
pub use settings::{CloudSettings, Settings};
