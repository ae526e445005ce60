//! Strongly-typed ID wrappers
//!
//! Shift, expense and recovery ids are separate types so a settlement can
//! never be pointed at an expense by mistake.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Full, unabbreviated form (the display form is shortened)
            pub fn to_full_string(&self) -> String {
                format!("{}{}", $display_prefix, self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, &self.0.to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(LocationId, "loc-");
define_id!(ShiftId, "sft-");
define_id!(ExpenseId, "exp-");
define_id!(RecoveryId, "rec-");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_abbreviated() {
        let id = ShiftId::new();
        let display = id.to_string();
        assert!(display.starts_with("sft-"));
        assert_eq!(display.len(), 12);
    }

    #[test]
    fn test_full_string_round_trips() {
        let id = RecoveryId::new();
        let parsed: RecoveryId = id.to_full_string().parse().unwrap();
        assert_eq!(id, parsed);

        let bare: RecoveryId = id.as_uuid().to_string().parse().unwrap();
        assert_eq!(id, bare);
    }

    #[test]
    fn test_abbreviated_form_does_not_parse() {
        let id = LocationId::new();
        assert!(id.to_string().parse::<LocationId>().is_err());
    }
}
