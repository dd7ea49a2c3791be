use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::error::{AppError, Result};
use crate::stats::SessionResult;
use crate::time_series::Sample;

/// Number of most recent results shown on the dashboard chart
pub const RECENT_RESULTS: usize = 20;

/// Completed session results, stored per local profile
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (or create) the history database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open the database under the user's state directory
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("typemaster_history.db"));
        debug!(path = %path.display(), "opening history db");
        Self::open(path)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                profile TEXT NOT NULL,
                date TEXT NOT NULL,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                correct_chars INTEGER NOT NULL,
                incorrect_chars INTEGER NOT NULL,
                total_chars INTEGER NOT NULL,
                elapsed_time REAL NOT NULL,
                history TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_session_results_profile ON session_results(profile)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn record(&self, profile: &str, result: &SessionResult) -> Result<()> {
        let history = serde_json::to_string(&result.history)?;
        self.conn.execute(
            r#"
            INSERT INTO session_results
            (profile, date, wpm, accuracy, correct_chars, incorrect_chars, total_chars, elapsed_time, history)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                profile,
                result.date.to_rfc3339(),
                result.wpm,
                result.accuracy,
                result.correct_chars as i64,
                result.incorrect_chars as i64,
                result.total_chars as i64,
                result.elapsed_time,
                history,
            ],
        )?;

        Ok(())
    }

    /// All results for `profile`, oldest first
    pub fn load(&self, profile: &str) -> Result<Vec<SessionResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, wpm, accuracy, correct_chars, incorrect_chars, total_chars, elapsed_time, history
            FROM session_results
            WHERE profile = ?1
            ORDER BY id ASC
            "#,
        )?;

        let rows = stmt.query_map([profile], |row| {
            let date_str: String = row.get(0)?;
            let date = DateTime::parse_from_rfc3339(&date_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "date".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            let history_json: String = row.get(7)?;
            let history: Vec<Sample> = serde_json::from_str(&history_json).map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    7,
                    "history".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?;

            Ok(SessionResult {
                wpm: row.get(1)?,
                accuracy: row.get(2)?,
                correct_chars: row.get::<_, i64>(3)? as usize,
                incorrect_chars: row.get::<_, i64>(4)? as usize,
                total_chars: row.get::<_, i64>(5)? as usize,
                elapsed_time: row.get(6)?,
                history,
                date,
            })
        })?;

        let mut results = Vec::new();
        for result in rows {
            results.push(result?);
        }

        Ok(results)
    }

    pub fn summary(&self, profile: &str) -> Result<HistorySummary> {
        Ok(HistorySummary::from_results(&self.load(profile)?))
    }

    /// Delete all results for `profile`, returning how many were removed
    pub fn clear(&self, profile: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM session_results WHERE profile = ?1", [profile])?;
        Ok(removed)
    }

    /// Write the profile's results to a CSV file, returning the row count
    pub fn export_csv<P: AsRef<Path>>(&self, profile: &str, path: P) -> Result<usize> {
        let results = self.load(profile)?;
        let mut writer = csv::Writer::from_path(path.as_ref())?;

        for result in &results {
            writer.serialize(ExportRow::from(result))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::Export(format!("failed to flush csv: {e}")))?;

        Ok(results.len())
    }
}

#[derive(Debug, Serialize)]
struct ExportRow {
    date: String,
    wpm: u32,
    accuracy: u32,
    correct_chars: usize,
    incorrect_chars: usize,
    total_chars: usize,
    elapsed_secs: String,
}

impl From<&SessionResult> for ExportRow {
    fn from(r: &SessionResult) -> Self {
        Self {
            date: r.date.to_rfc3339(),
            wpm: r.wpm,
            accuracy: r.accuracy,
            correct_chars: r.correct_chars,
            incorrect_chars: r.incorrect_chars,
            total_chars: r.total_chars,
            elapsed_secs: format!("{:.2}", r.elapsed_time),
        }
    }
}

/// One point of the dashboard progress chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentPoint {
    /// 1-based position within the recent window
    pub index: usize,
    pub wpm: u32,
    pub accuracy: u32,
}

/// Aggregates shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySummary {
    pub total_tests: usize,
    pub avg_wpm: u32,
    pub best_wpm: u32,
    /// spread of wpm across tests; lower is more consistent
    pub wpm_std_dev: f64,
    pub recent: Vec<RecentPoint>,
    /// newest first
    pub latest: Vec<SessionResult>,
}

impl HistorySummary {
    pub fn from_results(results: &[SessionResult]) -> Self {
        let total_tests = results.len();
        if total_tests == 0 {
            return Self::default();
        }

        let wpms: Vec<f64> = results.iter().map(|r| r.wpm as f64).collect();
        let mean = wpms.iter().sum::<f64>() / total_tests as f64;
        let variance = wpms.iter().map(|w| (w - mean) * (w - mean)).sum::<f64>() / total_tests as f64;

        let recent = results
            .iter()
            .skip(total_tests.saturating_sub(RECENT_RESULTS))
            .enumerate()
            .map(|(i, r)| RecentPoint {
                index: i + 1,
                wpm: r.wpm,
                accuracy: r.accuracy,
            })
            .collect();

        Self {
            total_tests,
            avg_wpm: mean.round() as u32,
            best_wpm: results.iter().map(|r| r.wpm).max().unwrap_or(0),
            wpm_std_dev: variance.sqrt(),
            recent,
            latest: results.iter().rev().cloned().collect(),
        }
    }
}
