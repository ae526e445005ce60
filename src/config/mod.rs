//! Configuration module
//!
//! - Data directory resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::TillPaths;
pub use settings::Settings;
