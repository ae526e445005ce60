//! Audit trail for shift and ledger mutations
//!
//! - `AuditEntry`: one immutable record with actor, action and before/after
//!   snapshots of the entity.
//! - `AuditLogger`: the stock [`AuditSink`](crate::external::AuditSink),
//!   appending JSON lines to `audit.log`.
//! - `generate_diff`: human-readable summary of what changed.
//!
//! Audit delivery is fire-and-forget: a failing sink is logged and never
//! rolls back the mutation it describes.

mod diff;
mod entry;
mod logger;

pub use diff::generate_diff;
pub use entry::{Action, AuditEntry, EntityType};
pub use logger::AuditLogger;
