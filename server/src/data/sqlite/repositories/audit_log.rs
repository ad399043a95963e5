//! Audit log repository for SQLite operations
//!
//! Change-set sides are stored as JSON text; `None` (unchanged) is NULL.

use sqlx::{SqliteConnection, SqlitePool};

use crate::core::constants::DEFAULT_AUDIT_PAGE_SIZE;
use crate::data::sqlite::SqliteError;
use crate::data::types::{AuditLogQuery, AuditLogRow, NewAuditLog};
use crate::utils::json::{json_to_opt_string, opt_string_to_json};

type AuditTuple = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
);

fn row_from_tuple(t: AuditTuple) -> AuditLogRow {
    AuditLogRow {
        id: t.0,
        actor: t.1,
        action: t.2,
        entity_name: t.3,
        entity_id: t.4,
        description: t.5,
        old_values: opt_string_to_json(t.6.as_deref()),
        new_values: opt_string_to_json(t.7.as_deref()),
        created_at: t.8,
    }
}

/// Insert an audit log entry, returning the stored row
///
/// Runs on the caller's connection so the entry can commit together with the
/// change it describes.
pub async fn insert_audit_log(
    conn: &mut SqliteConnection,
    entry: &NewAuditLog,
) -> Result<AuditLogRow, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let old_text = entry.old_values.as_ref().and_then(json_to_opt_string);
    let new_text = entry.new_values.as_ref().and_then(json_to_opt_string);

    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs (actor, action, entity_name, entity_id, description, old_values, new_values, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.actor)
    .bind(&entry.action)
    .bind(&entry.entity_name)
    .bind(&entry.entity_id)
    .bind(&entry.description)
    .bind(&old_text)
    .bind(&new_text)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(AuditLogRow {
        id: result.last_insert_rowid(),
        actor: entry.actor.clone(),
        action: entry.action.clone(),
        entity_name: entry.entity_name.clone(),
        entity_id: entry.entity_id.clone(),
        description: entry.description.clone(),
        old_values: entry.old_values.clone(),
        new_values: entry.new_values.clone(),
        created_at: now,
    })
}

/// List audit log entries, newest first
///
/// A zero limit uses the default page size.
pub async fn list_audit_logs(
    pool: &SqlitePool,
    query: &AuditLogQuery,
) -> Result<Vec<AuditLogRow>, SqliteError> {
    let limit = if query.limit == 0 {
        DEFAULT_AUDIT_PAGE_SIZE
    } else {
        query.limit
    };

    let rows = sqlx::query_as::<_, AuditTuple>(
        r#"
        SELECT id, actor, action, entity_name, entity_id, description, old_values, new_values, created_at
        FROM audit_logs
        WHERE (?1 IS NULL OR entity_name = ?1)
          AND (?2 IS NULL OR actor = ?2)
        ORDER BY created_at DESC, id DESC
        LIMIT ?3 OFFSET ?4
        "#,
    )
    .bind(&query.entity_name)
    .bind(&query.actor)
    .bind(limit)
    .bind(query.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_from_tuple).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteService;
    use serde_json::json;

    async fn setup_test_pool() -> SqlitePool {
        SqliteService::in_memory().await.unwrap().pool().clone()
    }

    async fn insert(pool: &SqlitePool, entry: &NewAuditLog) -> AuditLogRow {
        let mut conn = pool.acquire().await.unwrap();
        insert_audit_log(&mut conn, entry).await.unwrap()
    }

    fn entry(actor: &str, action: &str, entity: &str) -> NewAuditLog {
        NewAuditLog {
            actor: actor.to_string(),
            action: action.to_string(),
            entity_name: entity.to_string(),
            entity_id: Some("98301".to_string()),
            description: Some("Yard in".to_string()),
            old_values: Some(json!([{"_id": "98301", "in_yard": false}])),
            new_values: Some(json!([{"_id": "98301", "in_yard": true}])),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let pool = setup_test_pool().await;

        let inserted = insert(&pool, &entry("depot-sse", "YARD_IN", "coach_master")).await;
        assert!(inserted.id > 0);

        let rows = list_audit_logs(&pool, &AuditLogQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, inserted.id);
        assert_eq!(
            rows[0].new_values,
            Some(json!([{"_id": "98301", "in_yard": true}]))
        );
    }

    #[tokio::test]
    async fn test_unchanged_sides_store_null() {
        let pool = setup_test_pool().await;
        let mut unchanged = entry("system", "IMPORT", "coach_master");
        unchanged.old_values = None;
        unchanged.new_values = None;
        insert(&pool, &unchanged).await;

        let (old_raw, new_raw): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT old_values, new_values FROM audit_logs")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(old_raw, None);
        assert_eq!(new_raw, None);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let pool = setup_test_pool().await;
        insert(&pool, &entry("alice", "YARD_IN", "coach_master")).await;
        insert(&pool, &entry("bob", "BATTERY_STATUS", "coach_master")).await;
        insert(&pool, &entry("alice", "IMPORT", "coach_history")).await;

        let all = list_audit_logs(&pool, &AuditLogQuery::default()).await.unwrap();
        let actions: Vec<&str> = all.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["IMPORT", "BATTERY_STATUS", "YARD_IN"]);

        let by_actor = list_audit_logs(
            &pool,
            &AuditLogQuery {
                actor: Some("alice".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_actor.len(), 2);

        let by_entity = list_audit_logs(
            &pool,
            &AuditLogQuery {
                entity_name: Some("coach_master".into()),
                limit: 1,
                offset: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_entity.len(), 1);
        assert_eq!(by_entity[0].action, "YARD_IN");
    }
}
