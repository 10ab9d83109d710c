//! Whole-database export and import.
//!
//! Tables are listed in dependency order: every table appears after the
//! tables it references. Export reads each table as JSON rows inside one
//! read-only snapshot. Import deletes every table in reverse order, inserts
//! the dump in forward order and resets the id sequences, all in a single
//! transaction.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

/// Every dumped table, parents before children.
pub const TABLES: &[&str] = &[
    "users",
    "roles",
    "resources",
    "role_permissions",
    "organizations",
    "contacts",
    "leads",
    "products",
    "product_variants",
    "orders",
    "order_line_items",
    "design_jobs",
    "manufacturing",
    "manufacturing_updates",
    "notifications",
    "object_uploads",
    "settings",
    "status_remap_log",
];

/// Errors from export or import.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("dump references unknown table: {0}")]
    UnknownTable(String),

    #[error("table {0} appears more than once in the dump")]
    DuplicateTable(String),
}

/// Rows of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDump {
    pub name: String,
    pub rows: Vec<JsonValue>,
}

/// A full export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDump {
    pub exported_at: DateTime<Utc>,
    pub tables: Vec<TableDump>,
}

impl DataDump {
    /// Row count per table, in dump order.
    #[must_use]
    pub fn row_counts(&self) -> Vec<(&str, usize)> {
        self.tables
            .iter()
            .map(|t| (t.name.as_str(), t.rows.len()))
            .collect()
    }

    /// Rows for `table`, empty when the dump has none.
    #[must_use]
    pub fn rows(&self, table: &str) -> &[JsonValue] {
        self.tables
            .iter()
            .find(|t| t.name == table)
            .map_or(&[][..], |t| t.rows.as_slice())
    }

    /// Check that every table is known and appears once.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::UnknownTable` or `DumpError::DuplicateTable`.
    pub fn validate(&self) -> Result<(), DumpError> {
        let mut seen = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            if !TABLES.contains(&table.name.as_str()) {
                return Err(DumpError::UnknownTable(table.name.clone()));
            }
            if seen.contains(&table.name.as_str()) {
                return Err(DumpError::DuplicateTable(table.name.clone()));
            }
            seen.push(table.name.as_str());
        }
        Ok(())
    }

    /// Human-readable rendering: one header per table and one JSON line per row.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!("Rich Habits data export {}\n", self.exported_at.to_rfc3339());
        for table in &self.tables {
            let _ = writeln!(out, "\n== {} ({} rows) ==", table.name, table.rows.len());
            for row in &table.rows {
                let _ = writeln!(out, "{row}");
            }
        }
        out
    }
}

/// Tables keyed by something other than a serial `id`.
fn has_serial_id(table: &str) -> bool {
    !matches!(table, "object_uploads" | "settings" | "status_remap_log")
}

/// Export every table in [`TABLES`] from one consistent snapshot.
///
/// # Errors
///
/// Returns `DumpError::Database` if any read fails.
pub async fn export(pool: &PgPool) -> Result<DataDump, DumpError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let mut tables = Vec::with_capacity(TABLES.len());
    for &table in TABLES {
        let order = if has_serial_id(table) { "ORDER BY t.id" } else { "" };
        let rows: Vec<JsonValue> =
            sqlx::query_scalar(&format!("SELECT row_to_json(t)::jsonb FROM {table} t {order}"))
                .fetch_all(&mut *tx)
                .await?;
        info!(table, rows = rows.len(), "Exported table");
        tables.push(TableDump {
            name: table.to_string(),
            rows,
        });
    }

    tx.commit().await?;
    Ok(DataDump {
        exported_at: Utc::now(),
        tables,
    })
}

/// Replace the contents of every table in [`TABLES`] with `dump`.
///
/// Returns the inserted row count per table. Nothing is changed if any
/// step fails.
///
/// # Errors
///
/// Returns `DumpError::UnknownTable` for a table outside [`TABLES`], or
/// `DumpError::Database` if a delete, insert or sequence reset fails.
pub async fn import(pool: &PgPool, dump: &DataDump) -> Result<Vec<(&'static str, u64)>, DumpError> {
    dump.validate()?;

    let mut tx = pool.begin().await?;

    for &table in TABLES.iter().rev() {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?;
    }

    let mut counts = Vec::with_capacity(TABLES.len());
    for &table in TABLES {
        let rows = dump.rows(table);
        let inserted = if rows.is_empty() {
            0
        } else {
            sqlx::query(&format!(
                "INSERT INTO {table} SELECT * FROM jsonb_populate_recordset(NULL::{table}, $1)"
            ))
            .bind(JsonValue::Array(rows.to_vec()))
            .execute(&mut *tx)
            .await?
            .rows_affected()
        };

        if has_serial_id(table) {
            sqlx::query(&format!(
                "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                 COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
            ))
            .execute(&mut *tx)
            .await?;
        }

        info!(table, rows = inserted, "Imported table");
        counts.push((table, inserted));
    }

    tx.commit().await?;
    Ok(counts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DataDump {
        DataDump {
            exported_at: Utc::now(),
            tables: vec![
                TableDump {
                    name: "users".to_string(),
                    rows: vec![json!({"id": 1, "email": "a@richhabits.com"})],
                },
                TableDump {
                    name: "orders".to_string(),
                    rows: vec![json!({"id": 1}), json!({"id": 2})],
                },
            ],
        }
    }

    #[test]
    fn test_tables_are_unique() {
        for (i, table) in TABLES.iter().enumerate() {
            assert!(!TABLES.iter().skip(i + 1).any(|t| t == table), "{table}");
        }
    }

    #[test]
    fn test_children_follow_parents() {
        let pos = |name: &str| TABLES.iter().position(|t| *t == name).unwrap();
        assert!(pos("users") < pos("leads"));
        assert!(pos("roles") < pos("role_permissions"));
        assert!(pos("resources") < pos("role_permissions"));
        assert!(pos("orders") < pos("order_line_items"));
        assert!(pos("product_variants") < pos("order_line_items"));
        assert!(pos("manufacturing") < pos("manufacturing_updates"));
    }

    #[test]
    fn test_rows_for_missing_table_is_empty() {
        let dump = sample();
        assert_eq!(dump.rows("orders").len(), 2);
        assert!(dump.rows("contacts").is_empty());
    }

    #[test]
    fn test_validate_rejects_unknown_and_duplicate_tables() {
        let mut dump = sample();
        dump.tables.push(TableDump {
            name: "pg_authid".to_string(),
            rows: vec![],
        });
        assert!(matches!(dump.validate(), Err(DumpError::UnknownTable(t)) if t == "pg_authid"));

        let mut dump = sample();
        dump.tables.push(TableDump {
            name: "users".to_string(),
            rows: vec![],
        });
        assert!(matches!(dump.validate(), Err(DumpError::DuplicateTable(t)) if t == "users"));
    }

    #[test]
    fn test_json_round_trip_preserves_counts() {
        let dump = sample();
        let json = serde_json::to_string(&dump).unwrap();
        assert!(json.contains("\"exportedAt\""));
        let back: DataDump = serde_json::from_str(&json).unwrap();
        assert_eq!(back.row_counts(), dump.row_counts());
    }

    #[test]
    fn test_text_rendering_has_table_headers() {
        let text = sample().to_text();
        assert!(text.contains("== users (1 rows) =="));
        assert!(text.contains("== orders (2 rows) =="));
        assert_eq!(text.lines().filter(|l| l.starts_with('{')).count(), 3);
    }
}
