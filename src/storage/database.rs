//! SQLite database for persistent storage

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{AnalysisRecord, AnalysisStore, NewAnalysis};
use crate::nutrition::NutrientProfile;
use crate::scoring::Verdict;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS analyses (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name    TEXT NOT NULL DEFAULT 'Unknown Product',
    image_path      TEXT NOT NULL,
    calories        REAL,
    sugar           REAL,
    fat             REAL,
    sodium          REAL,
    protein         REAL,
    fiber           REAL,
    health_score    INTEGER NOT NULL,
    verdict         TEXT NOT NULL,
    explanation     TEXT NOT NULL,
    recommendation  TEXT NOT NULL,
    raw_ocr_text    TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS analyses_created_at ON analyses(created_at);
"#;

const SELECT_COLUMNS: &str = "SELECT id, product_name, image_path, calories, sugar, fat, sodium, \
     protein, fiber, health_score, verdict, explanation, recommendation, raw_ocr_text, created_at \
     FROM analyses";

/// Database connection wrapper
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create database directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!("Could not enable WAL journal mode: {}", e);
        }
        info!("Opened analysis database at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Open a private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(SCHEMA)
            .context("create analyses schema")?;
        Ok(())
    }
}

fn conversion_error(
    index: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    let verdict: String = row.get(10)?;
    let verdict = verdict
        .parse::<Verdict>()
        .map_err(|e| conversion_error(10, e))?;

    let created_at: String = row.get(14)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| conversion_error(14, e))?
        .with_timezone(&Utc);

    Ok(AnalysisRecord {
        id: row.get(0)?,
        product_name: row.get(1)?,
        image_path: row.get(2)?,
        nutrients: NutrientProfile {
            calories: row.get(3)?,
            sugar: row.get(4)?,
            fat: row.get(5)?,
            sodium: row.get(6)?,
            protein: row.get(7)?,
            fiber: row.get(8)?,
        },
        health_score: row.get(9)?,
        verdict,
        explanation: row.get(11)?,
        recommendation: row.get(12)?,
        raw_ocr_text: row.get(13)?,
        created_at,
    })
}

impl AnalysisStore for Database {
    fn insert(&self, analysis: &NewAnalysis) -> Result<i64> {
        let conn = self.conn.lock();
        let nutrients = &analysis.nutrients;
        conn.execute(
            "INSERT INTO analyses (product_name, image_path, calories, sugar, fat, sodium, protein, \
             fiber, health_score, verdict, explanation, recommendation, raw_ocr_text, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                analysis.product_name,
                analysis.image_path,
                nutrients.calories,
                nutrients.sugar,
                nutrients.fat,
                nutrients.sodium,
                nutrients.protein,
                nutrients.fiber,
                analysis.health_score,
                analysis.verdict.label(),
                analysis.explanation,
                analysis.recommendation,
                analysis.raw_ocr_text,
                analysis
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )
        .context("insert analysis")?;

        let id = conn.last_insert_rowid();
        debug!("Inserted analysis {}", id);
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Option<AnalysisRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                row_to_record,
            )
            .optional()
            .with_context(|| format!("load analysis {}", id))?;
        Ok(record)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM analyses WHERE id = ?1", params![id])
            .with_context(|| format!("delete analysis {}", id))?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<AnalysisRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC, id DESC",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("list analyses")?;
        Ok(records)
    }

    fn get_many(&self, ids: &[i64]) -> Result<Vec<AnalysisRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(ids.len());
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            if let Some(record) = stmt
                .query_row(params![id], row_to_record)
                .optional()
                .with_context(|| format!("load analysis {}", id))?
            {
                records.push(record);
            }
        }
        Ok(records)
    }
}
