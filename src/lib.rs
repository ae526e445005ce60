//! Till - cash drawer accountability for multi-location businesses
//!
//! This library tracks the physical cash drawer at each location through
//! shifts. A shift opens with a float, collects expenses while open, and
//! closes with a reconciliation against counted cash. Shortfalls become
//! debts that later surpluses repay in FIFO order.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (locations, shifts, expenses, recovery records)
//! - `storage`: JSON file storage, per-location locks and atomic commits
//! - `services`: Business logic layer
//! - `audit`: Audit logging system
//! - `external`: Sales, operator and audit collaborator traits
//!
//! # Example
//!
//! ```rust,ignore
//! use till::config::{TillPaths, Settings};
//! use till::storage::Storage;
//!
//! let paths = TillPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::new(paths)?;
//! storage.load_all()?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod external;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{TillError, TillResult};
