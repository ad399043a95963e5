//! Domain logic for coach maintenance records
//!
//! - `audit` - Change-set diffing, audit persistence and change notifications
//! - `workflow` - Scalar-update workflows over master records

pub mod audit;
pub mod workflow;

pub use audit::{AuditEntry, AuditService, ChangeNotifier, DiffOptions};
pub use workflow::{Workflow, WorkflowError, WorkflowOutcome, WorkflowRequest, run_workflow};
