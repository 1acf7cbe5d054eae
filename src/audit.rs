use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: &'static str,
    pub resource: Option<&'static str>,
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> AppResult<()>;
}

/// Writes audit entries to the `audit_logs` table.
pub struct PgAuditLog {
    pool: DbPool,
}

impl PgAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, resource, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(entry.resource)
        .bind(entry.metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Emits audit entries as tracing events only.
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        tracing::info!(
            target: "audit",
            user_id = ?entry.user_id,
            action = entry.action,
            resource = ?entry.resource,
            metadata = ?entry.metadata,
            "audit"
        );
        Ok(())
    }
}

/// Record an audit entry; failures are logged and swallowed.
pub async fn log_audit(
    audit: &dyn AuditLog,
    user_id: Option<Uuid>,
    action: &'static str,
    resource: Option<&'static str>,
    metadata: Option<Value>,
) {
    let entry = AuditEntry {
        user_id,
        action,
        resource,
        metadata,
    };
    if let Err(err) = audit.record(entry).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
