//! Audit log row types

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Audit log row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogRow {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub entity_name: String,
    pub entity_id: Option<String>,
    pub description: Option<String>,
    /// Pruned old side of the change-set, `None` when nothing changed
    pub old_values: Option<JsonValue>,
    /// Pruned new side of the change-set, `None` when nothing changed
    pub new_values: Option<JsonValue>,
    pub created_at: i64,
}

/// Audit log entry to insert
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor: String,
    pub action: String,
    pub entity_name: String,
    pub entity_id: Option<String>,
    pub description: Option<String>,
    pub old_values: Option<JsonValue>,
    pub new_values: Option<JsonValue>,
}

/// Query parameters for audit log listing
#[derive(Debug, Clone, Default)]
pub struct AuditLogQuery {
    pub limit: u32,
    pub offset: u32,
    pub entity_name: Option<String>,
    pub actor: Option<String>,
}
