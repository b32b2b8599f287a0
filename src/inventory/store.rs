//! SQLite-backed [`ToolStore`].
//!
//! Rates are kept as a JSON object column (`{"1": 10, "2": 18}`) so a record
//! carries either pricing form without schema changes. The schema is applied
//! inline via `include_str!` on open.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::{Pricing, RateTier, StoreError, Tool, ToolStatus, ToolStore};

const SCHEMA_SQL: &str = include_str!("../../migrations/001_tools.sql");

const SELECT_COLUMNS: &str = "SELECT id, name, status, price, duration_minutes, rates FROM tools";

type ToolRow = (
    String,
    String,
    String,
    Option<f64>,
    Option<i64>,
    Option<String>,
);

/// Tool records persisted in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteToolStore {
    pool: SqlitePool,
}

impl SqliteToolStore {
    /// Open (or create) the store at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema fails.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(sqlx::Error::Io(e)))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .pragma("trusted_schema", "OFF");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "tool store opened");
        Self::from_pool(pool).await
    }

    /// Open a private in-memory store.
    ///
    /// Uses a single connection that never expires, so the database lives as
    /// long as the store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and apply the schema.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Insert or update a record from an administrative catalog.
    ///
    /// When `overwrite_status` is false an existing record keeps its current
    /// status so re-seeding never returns a rented tool to the shelf.
    pub async fn upsert(&self, tool: &Tool, overwrite_status: bool) -> Result<(), StoreError> {
        let (price, duration_minutes, rates) = pricing_columns(&tool.pricing);

        let sql = if overwrite_status {
            "INSERT INTO tools (id, name, status, price, duration_minutes, rates) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, status = excluded.status, price = excluded.price, \
               duration_minutes = excluded.duration_minutes, rates = excluded.rates, \
               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"
        } else {
            "INSERT INTO tools (id, name, status, price, duration_minutes, rates) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, price = excluded.price, \
               duration_minutes = excluded.duration_minutes, rates = excluded.rates, \
               updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"
        };

        sqlx::query(sql)
            .bind(&tool.id)
            .bind(&tool.name)
            .bind(tool.status.as_str())
            .bind(price)
            .bind(duration_minutes)
            .bind(rates)
            .execute(&self.pool)
            .await?;

        debug!(id = %tool.id, overwrite_status, "tool record upserted");
        Ok(())
    }

    /// Returns a reference to the underlying SQLite pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ToolStore for SqliteToolStore {
    async fn list_all(&self) -> Result<Vec<Tool>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY name COLLATE NOCASE ASC, id ASC");
        let rows: Vec<ToolRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_tool).collect()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Tool>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let row: Option<ToolRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_tool).transpose()
    }

    async fn conditional_update(
        &self,
        id: &str,
        expected: ToolStatus,
        new: ToolStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE tools SET status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') \
             WHERE id = ?2 AND status = ?3",
        )
        .bind(new.as_str())
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            debug!(id, from = %expected, to = %new, "tool status updated");
            return Ok(());
        }

        // Nothing matched: tell a missing record apart from a lost race.
        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM tools WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Err(StoreError::PreconditionFailed {
                id: id.to_owned(),
                expected,
            }),
            None => Err(StoreError::NotFound(id.to_owned())),
        }
    }
}

fn row_to_tool(row: ToolRow) -> Result<Tool, StoreError> {
    let (id, name, status, price, duration_minutes, rates) = row;
    let status = ToolStatus::parse(&status)?;
    let pricing = decode_pricing(&id, price, duration_minutes, rates.as_deref());
    Ok(Tool {
        id,
        name,
        status,
        pricing,
    })
}

/// Rates win over a flat price. Malformed rates are logged and ignored.
fn decode_pricing(
    id: &str,
    price: Option<f64>,
    duration_minutes: Option<i64>,
    rates: Option<&str>,
) -> Pricing {
    if let Some(raw) = rates {
        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw) {
            Ok(map) => {
                let mut tiers = Vec::with_capacity(map.len());
                for (key, value) in &map {
                    match (key.trim().parse::<f64>(), value.as_f64()) {
                        (Ok(hours), Some(price)) if hours.is_finite() => {
                            tiers.push(RateTier { hours, price });
                        }
                        _ => warn!(id, key = %key, "skipping unreadable rate tier"),
                    }
                }
                if !tiers.is_empty() {
                    return Pricing::tiered(tiers);
                }
            }
            Err(e) => warn!(id, error = %e, "ignoring malformed rates column"),
        }
    }

    match price {
        Some(price) => Pricing::Flat {
            price,
            duration_minutes: duration_minutes.and_then(|d| u32::try_from(d).ok()),
        },
        None => Pricing::Unpriced,
    }
}

fn pricing_columns(pricing: &Pricing) -> (Option<f64>, Option<i64>, Option<String>) {
    match pricing {
        Pricing::Flat {
            price,
            duration_minutes,
        } => (Some(*price), duration_minutes.map(i64::from), None),
        Pricing::Tiered(tiers) => {
            let map: serde_json::Map<String, serde_json::Value> = tiers
                .iter()
                .map(|t| (t.hours.to_string(), serde_json::json!(t.price)))
                .collect();
            (None, None, Some(serde_json::Value::Object(map).to_string()))
        }
        Pricing::Unpriced => (None, None, None),
    }
}
