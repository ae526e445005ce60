//! Location model
//!
//! A retail location and the fixed float its drawer must hold at the start of
//! every shift. Locations are configured outside the shift engine and are
//! read-only to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::LocationId;
use super::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,

    /// Display name (e.g. "Main Street")
    pub name: String,

    /// Target cash expected in the drawer at each opening
    pub fixed_float: Money,

    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(name: impl Into<String>, fixed_float: Money) -> Self {
        Self {
            id: LocationId::new(),
            name: name.into(),
            fixed_float,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), LocationValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(LocationValidationError::EmptyName);
        }
        if name.len() > 100 {
            return Err(LocationValidationError::NameTooLong(name.len()));
        }
        if self.fixed_float.is_negative() {
            return Err(LocationValidationError::NegativeFloat(self.fixed_float));
        }
        Ok(())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (float {})", self.name, self.fixed_float)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationValidationError {
    EmptyName,
    NameTooLong(usize),
    NegativeFloat(Money),
}

impl LocationValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyName | Self::NameTooLong(_) => "name",
            Self::NegativeFloat(_) => "fixed_float",
        }
    }
}

impl fmt::Display for LocationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Location name cannot be empty"),
            Self::NameTooLong(len) => write!(f, "Location name too long ({} chars, max 100)", len),
            Self::NegativeFloat(amount) => write!(f, "Fixed float cannot be negative ({})", amount),
        }
    }
}

impl std::error::Error for LocationValidationError {}
