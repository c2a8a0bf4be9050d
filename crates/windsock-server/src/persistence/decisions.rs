//! Decision history; implements the engine's persistence seam.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use windsock_core::{Decision, DecisionStore, Factor, StoreError};

use super::{enum_from_str, enum_to_str, parse_timestamp};

/// Append-only decision log backed by SQLite.
#[derive(Clone)]
pub struct DecisionLog {
    pool: SqlitePool,
}

impl DecisionLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, decision: &Decision) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO decisions (id, launch_id, decided_at, severity, factors, message)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&decision.id)
        .bind(&decision.launch_id)
        .bind(decision.decided_at.to_rfc3339())
        .bind(enum_to_str(&decision.severity)?)
        .bind(serde_json::to_string(&decision.factors)?)
        .bind(&decision.message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Decisions for a launch since `from`, newest first.
    pub async fn history(
        &self,
        launch_id: &str,
        from: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Decision>> {
        let rows = sqlx::query_as::<_, DecisionRow>(
            "SELECT id, launch_id, decided_at, severity, factors, message FROM decisions \
             WHERE launch_id = ?1 AND decided_at >= ?2 ORDER BY decided_at DESC LIMIT ?3",
        )
        .bind(launch_id)
        .bind(from.to_rfc3339())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[async_trait]
impl DecisionStore for DecisionLog {
    async fn append_decision(&self, decision: &Decision) -> Result<(), StoreError> {
        self.append(decision)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}

#[derive(sqlx::FromRow)]
struct DecisionRow {
    id: String,
    launch_id: String,
    decided_at: String,
    severity: String,
    factors: String,
    message: String,
}

impl TryFrom<DecisionRow> for Decision {
    type Error = anyhow::Error;

    fn try_from(row: DecisionRow) -> Result<Self> {
        let factors: Vec<Factor> = serde_json::from_str(&row.factors)?;
        Ok(Decision {
            id: row.id,
            launch_id: row.launch_id,
            decided_at: parse_timestamp(&row.decided_at)?,
            severity: enum_from_str(&row.severity)?,
            factors,
            message: row.message,
        })
    }
}
