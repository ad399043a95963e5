//! Daily-operation workflows
//!
//! Every workflow sets one field on a selection of master records and writes
//! an audit entry holding the before/after change-set. The update and its
//! audit entry commit together or not at all.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::data::DataError;
use crate::data::sqlite::SqliteError;
use crate::data::sqlite::repositories::{get_records, update_field};
use crate::data::types::{
    AuditLogRow, FieldKind, FieldValue, Record, RecordKind, parse_date, records_to_json,
};

use super::audit::{AuditEntry, AuditService};

/// Named scalar update on master records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    YardIn,
    YardOut,
    BatteryStatus,
    UpholsteryStatus,
    TestDate,
    FitmentDate,
}

impl Workflow {
    pub const ALL: [Workflow; 6] = [
        Workflow::YardIn,
        Workflow::YardOut,
        Workflow::BatteryStatus,
        Workflow::UpholsteryStatus,
        Workflow::TestDate,
        Workflow::FitmentDate,
    ];

    /// Audit action name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Workflow::YardIn => "yard_in",
            Workflow::YardOut => "yard_out",
            Workflow::BatteryStatus => "battery_status",
            Workflow::UpholsteryStatus => "upholstery_status",
            Workflow::TestDate => "test_date",
            Workflow::FitmentDate => "fitment_date",
        }
    }

    /// Master field the workflow writes
    pub const fn field(&self) -> &'static str {
        match self {
            Workflow::YardIn => "yard_in_date",
            Workflow::YardOut => "yard_out_date",
            Workflow::BatteryStatus => "battery_status",
            Workflow::UpholsteryStatus => "upholstery_status",
            Workflow::TestDate => "brake_test_date",
            Workflow::FitmentDate => "fire_extinguisher_fitment_date",
        }
    }

    pub const fn value_kind(&self) -> FieldKind {
        match self {
            Workflow::BatteryStatus | Workflow::UpholsteryStatus => FieldKind::Text,
            _ => FieldKind::Date,
        }
    }

    /// Parse the operator-supplied value for this workflow's field
    pub fn parse_value(&self, raw: &str) -> Result<FieldValue, WorkflowError> {
        let trimmed = raw.trim();
        let parsed = match self.value_kind() {
            FieldKind::Date => parse_date(trimmed).map(FieldValue::Date),
            _ if trimmed.is_empty() => None,
            _ => Some(FieldValue::Text(trimmed.to_string())),
        };
        parsed.ok_or_else(|| WorkflowError::InvalidValue {
            workflow: *self,
            value: raw.to_string(),
            expected: self.value_kind(),
        })
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Workflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Workflow::ALL
            .into_iter()
            .find(|w| w.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Workflow::ALL.iter().map(|w| w.as_str()).collect();
                format!(
                    "Invalid workflow '{}'. Valid options: {}",
                    s,
                    valid.join(", ")
                )
            })
    }
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("No coaches selected")]
    EmptySelection,

    #[error("Unknown coach numbers: {}", .0.join(", "))]
    UnknownCoaches(Vec<String>),

    #[error("Invalid value '{value}' for {workflow}: expected {expected}")]
    InvalidValue {
        workflow: Workflow,
        value: String,
        expected: FieldKind,
    },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// One workflow invocation
#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub workflow: Workflow,
    pub coachnos: Vec<String>,
    pub value: String,
    pub actor: String,
    pub description: Option<String>,
}

/// Result of a workflow run
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub updated: u64,
    /// Selected coach numbers with no master record
    pub missing: Vec<String>,
    pub audit: AuditLogRow,
}

/// Apply a workflow and record its audit entry
///
/// Blank and repeated coach numbers are dropped. A selection where no coach
/// exists fails; a partially unknown selection proceeds and reports the
/// missing numbers.
pub async fn run_workflow(
    pool: &SqlitePool,
    audit: &AuditService,
    request: WorkflowRequest,
) -> Result<WorkflowOutcome, WorkflowError> {
    let workflow = request.workflow;
    let selection = normalize_selection(&request.coachnos);
    if selection.is_empty() {
        return Err(WorkflowError::EmptySelection);
    }
    let value = workflow.parse_value(&request.value)?;
    let kind = RecordKind::Master;

    let mut tx = pool.begin().await.map_err(storage)?;

    let before = get_records(&mut tx, kind, &selection)
        .await
        .map_err(storage)?;
    let found: Vec<String> = before.iter().filter_map(Record::identity).collect();
    let missing: Vec<String> = selection
        .iter()
        .filter(|c| !found.contains(c))
        .cloned()
        .collect();

    if found.is_empty() {
        return Err(WorkflowError::UnknownCoaches(missing));
    }
    if !missing.is_empty() {
        tracing::warn!(
            %workflow,
            missing = ?missing,
            "Workflow selection includes unknown coaches"
        );
    }

    let updated = update_field(&mut tx, kind, &found, workflow.field(), &value)
        .await
        .map_err(storage)?;
    let after = get_records(&mut tx, kind, &found)
        .await
        .map_err(storage)?;

    let mut entry = AuditEntry::new(request.actor, workflow.as_str(), kind.table())
        .with_entity_id(found.join(","));
    if let Some(description) = request.description {
        entry = entry.with_description(description);
    }
    let old = records_to_json(&before);
    let new = records_to_json(&after);
    let row = audit.record_on(&mut tx, entry, &old, &new).await?;

    tx.commit().await.map_err(storage)?;
    audit.publish(&row, &old, &new);

    tracing::info!(
        %workflow,
        coaches = found.len(),
        updated,
        audit_id = row.id,
        "Workflow applied"
    );

    Ok(WorkflowOutcome {
        updated,
        missing,
        audit: row,
    })
}

fn storage(e: impl Into<SqliteError>) -> WorkflowError {
    WorkflowError::Data(DataError::from(e.into()))
}

fn normalize_selection(coachnos: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    coachnos
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty() && seen.insert(*c))
        .map(str::to_string)
        .collect()
}
