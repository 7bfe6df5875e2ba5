use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult, state::AppState, store::AuditEntry};

pub async fn log_audit(pool: &DbPool, entry: &AuditEntry) -> AppResult<()> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(entry.user_id)
    .bind(entry.action.as_str())
    .bind(entry.resource.as_deref())
    .bind(entry.metadata.clone())
    .execute(pool)
    .await?;

    Ok(())
}

/// Records an audit entry; a failure is only logged.
pub async fn record(
    state: &AppState,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let entry = AuditEntry {
        user_id,
        action: action.to_string(),
        resource: Some(resource.to_string()),
        metadata: Some(metadata),
    };
    if let Err(err) = state.store.record_audit(entry).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
