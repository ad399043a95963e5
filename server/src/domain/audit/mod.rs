//! Audit trail for coach record changes
//!
//! - `diff` - Minimal change-set between two JSON snapshots
//! - `notify` - Broadcast of full snapshots to in-process subscribers
//! - `service` - Diff, persist and notify in one call

pub mod diff;
pub mod notify;
pub mod service;

pub use diff::{ArrayAlignment, ChangeSet, DiffOptions, SYNTHETIC_ID_KEY, diff, diff_with};
pub use notify::{ChangeNotification, ChangeNotifier, ChangeSubscriber, NotifyError};
pub use service::{AuditEntry, AuditService};
