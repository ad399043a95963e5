//! Audit service: diff, persist, then notify

use serde_json::Value as JsonValue;
use sqlx::{SqliteConnection, SqlitePool};

use crate::data::DataError;
use crate::data::sqlite::SqliteError;
use crate::data::sqlite::repositories::{insert_audit_log, list_audit_logs};
use crate::data::types::{AuditLogQuery, AuditLogRow, NewAuditLog};

use super::diff::{ArrayAlignment, DiffOptions, diff_with};
use super::notify::{ChangeNotification, ChangeNotifier};

/// Who did what to which entity
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor: String,
    pub action: String,
    pub entity_name: String,
    pub entity_id: Option<String>,
    pub description: Option<String>,
    /// Overrides the service's array alignment for this entry
    pub alignment: Option<ArrayAlignment>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        entity_name: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            entity_name: entity_name.into(),
            entity_id: None,
            description: None,
            alignment: None,
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_alignment(mut self, alignment: ArrayAlignment) -> Self {
        self.alignment = Some(alignment);
        self
    }
}

/// Writes audit log entries and publishes change notifications
#[derive(Debug, Clone)]
pub struct AuditService {
    pool: SqlitePool,
    options: DiffOptions,
    notifier: Option<ChangeNotifier>,
}

impl AuditService {
    pub fn new(pool: SqlitePool, options: DiffOptions) -> Self {
        Self {
            pool,
            options,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: ChangeNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Record a change between two snapshots
    ///
    /// The log row stores only the change-set. Notification happens after the
    /// write and never fails the call.
    pub async fn record(
        &self,
        entry: AuditEntry,
        old: &JsonValue,
        new: &JsonValue,
    ) -> Result<AuditLogRow, DataError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteError::from)?;
        let row = self.record_on(&mut conn, entry, old, new).await?;
        self.publish(&row, old, new);
        Ok(row)
    }

    /// Write the audit row on the caller's connection without notifying
    ///
    /// Call `publish` once the surrounding transaction has committed.
    pub async fn record_on(
        &self,
        conn: &mut SqliteConnection,
        entry: AuditEntry,
        old: &JsonValue,
        new: &JsonValue,
    ) -> Result<AuditLogRow, DataError> {
        let options = DiffOptions {
            identity_field: self.options.identity_field.clone(),
            alignment: entry.alignment.unwrap_or(self.options.alignment),
        };
        let change = diff_with(old, new, &options);
        if change.is_unchanged() {
            tracing::debug!(
                action = %entry.action,
                entity = %entry.entity_name,
                "Audited change has no differences"
            );
        }

        let row = insert_audit_log(
            conn,
            &NewAuditLog {
                actor: entry.actor,
                action: entry.action,
                entity_name: entry.entity_name,
                entity_id: entry.entity_id,
                description: entry.description,
                old_values: change.old_diff,
                new_values: change.new_diff,
            },
        )
        .await?;

        tracing::info!(
            audit_id = row.id,
            actor = %row.actor,
            action = %row.action,
            entity = %row.entity_name,
            "Audit entry recorded"
        );
        Ok(row)
    }

    /// Send full snapshots to subscribers of a committed entry
    pub fn publish(&self, row: &AuditLogRow, old: &JsonValue, new: &JsonValue) {
        if let Some(notifier) = &self.notifier {
            notifier.publish(ChangeNotification {
                audit_id: row.id,
                actor: row.actor.clone(),
                action: row.action.clone(),
                entity_name: row.entity_name.clone(),
                entity_id: row.entity_id.clone(),
                old: old.clone(),
                new: new.clone(),
            });
        }
    }

    /// List audit entries, newest first
    pub async fn list(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogRow>, DataError> {
        Ok(list_audit_logs(&self.pool, query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteService;
    use serde_json::json;
    use std::time::Duration;

    async fn service() -> AuditService {
        let db = SqliteService::in_memory().await.unwrap();
        AuditService::new(db.pool().clone(), DiffOptions::default())
    }

    #[tokio::test]
    async fn test_record_stores_change_set() {
        let audit = service().await;
        let old = json!([{"coachno": "98301", "pohby": "PL", "built_year": 1998}]);
        let new = json!([{"coachno": "98301", "pohby": "JP", "built_year": 1998}]);

        let row = audit
            .record(
                AuditEntry::new("supervisor", "edit", "master")
                    .with_entity_id("98301")
                    .with_description("POH workshop corrected"),
                &old,
                &new,
            )
            .await
            .unwrap();

        assert_eq!(row.old_values, Some(json!([{"_id": "98301", "pohby": "PL"}])));
        assert_eq!(row.new_values, Some(json!([{"_id": "98301", "pohby": "JP"}])));
        assert_eq!(row.entity_id.as_deref(), Some("98301"));

        let listed = audit.list(&AuditLogQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, row.id);
        assert_eq!(listed[0].new_values, row.new_values);
    }

    #[tokio::test]
    async fn test_unchanged_snapshots_store_no_values() {
        let audit = service().await;
        let snapshot = json!({"coachno": "98301", "pohby": "PL"});
        let row = audit
            .record(AuditEntry::new("system", "edit", "master"), &snapshot, &snapshot)
            .await
            .unwrap();
        assert!(row.old_values.is_none());
        assert!(row.new_values.is_none());
    }

    #[tokio::test]
    async fn test_notification_carries_full_snapshots() {
        let notifier = ChangeNotifier::new(8);
        let audit = service().await.with_notifier(notifier.clone());
        let mut rx = notifier.subscribe();

        let old = json!({"coachno": "98301", "in_yard": false, "remarks": "ok"});
        let new = json!({"coachno": "98301", "in_yard": true, "remarks": "ok"});
        let row = audit
            .record(AuditEntry::new("supervisor", "yard_in", "master"), &old, &new)
            .await
            .unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got.audit_id, row.id);
        assert_eq!(got.old, old);
        assert_eq!(got.new, new);
        assert_eq!(row.new_values, Some(json!({"in_yard": true})));
    }

    #[tokio::test]
    async fn test_record_without_subscribers_succeeds() {
        let audit = service().await.with_notifier(ChangeNotifier::new(1));
        let row = audit
            .record(
                AuditEntry::new("system", "import", "master"),
                &JsonValue::Null,
                &json!([{"coachno": "1"}]),
            )
            .await
            .unwrap();
        assert_eq!(row.old_values, Some(JsonValue::Null));
    }

    #[tokio::test]
    async fn test_identity_alignment_override_for_inserted_coach() {
        let audit = service().await;
        let before = json!([
            {"coachno": "A", "pohby": "PL"},
            {"coachno": "C", "pohby": "JP"}
        ]);
        let after = json!([
            {"coachno": "A", "pohby": "PL"},
            {"coachno": "B", "pohby": "PL"},
            {"coachno": "C", "pohby": "JP"}
        ]);

        let positional = audit
            .record(AuditEntry::new("system", "import", "coach_master"), &before, &after)
            .await
            .unwrap();
        assert_eq!(positional.old_values.unwrap()[0]["coachno"], json!("C"));

        let row = audit
            .record(
                AuditEntry::new("system", "import", "coach_master")
                    .with_alignment(ArrayAlignment::ByIdentity),
                &before,
                &after,
            )
            .await
            .unwrap();
        assert_eq!(row.old_values, Some(json!([null])));
        assert_eq!(
            row.new_values,
            Some(json!([{"_id": "B", "coachno": "B", "pohby": "PL"}]))
        );
    }

    #[tokio::test]
    async fn test_record_on_defers_notification() {
        let db = SqliteService::in_memory().await.unwrap();
        let notifier = ChangeNotifier::new(4);
        let audit = AuditService::new(db.pool().clone(), DiffOptions::default())
            .with_notifier(notifier.clone());
        let mut rx = notifier.subscribe();

        let old = json!({"coachno": "98301", "in_yard": false});
        let new = json!({"coachno": "98301", "in_yard": true});
        let mut tx = db.pool().begin().await.unwrap();
        let entry = AuditEntry::new("supervisor", "yard_in", "coach_master");
        let row = audit.record_on(&mut tx, entry, &old, &new).await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(20), rx.recv()).await;
        assert!(pending.is_err());

        tx.commit().await.unwrap();
        audit.publish(&row, &old, &new);
        assert_eq!(rx.recv().await.unwrap().audit_id, row.id);
    }
}
