use crate::app_dirs::AppDirs;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::io;
use std::path::PathBuf;

/// One finished run as stored in the history database.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub mode: String,
    pub personality: Option<String>,
    pub wpm: f64,
    pub accuracy: f64,
    pub mistakes: i64,
    pub elapsed_secs: f64,
    pub timestamp: DateTime<Local>,
}

/// Database manager for completed-run history
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (or create) the history database in the platform state dir.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("keydash_history.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        Self::with_connection(Connection::open(&db_path)?)
    }

    /// Build on an existing connection (tests use an in-memory one).
    pub fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode TEXT NOT NULL,
                personality TEXT,
                wpm REAL NOT NULL,
                accuracy REAL NOT NULL,
                mistakes INTEGER NOT NULL,
                elapsed_secs REAL NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_mode ON runs(mode)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_timestamp ON runs(timestamp)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn record_run(&self, run: &RunRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO runs
            (mode, personality, wpm, accuracy, mistakes, elapsed_secs, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                run.mode,
                run.personality,
                run.wpm,
                run.accuracy,
                run.mistakes,
                run.elapsed_secs,
                run.timestamp.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Most recent runs, newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT mode, personality, wpm, accuracy, mistakes, elapsed_secs, timestamp
            FROM runs
            ORDER BY timestamp DESC
            LIMIT ?1
            "#,
        )?;

        let run_iter = stmt.query_map([limit as i64], Self::row_to_record)?;

        let mut runs = Vec::new();
        for run in run_iter {
            runs.push(run?);
        }

        Ok(runs)
    }

    /// Best WPM recorded for a mode, if any run exists.
    pub fn best_wpm(&self, mode: &str) -> Result<Option<f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT MAX(wpm) FROM runs WHERE mode = ?1")?;
        let best: Option<f64> = stmt.query_row([mode], |row| row.get(0))?;
        Ok(best)
    }

    /// Per-mode aggregates: (mode, avg wpm, avg accuracy, run count).
    pub fn mode_summary(&self) -> Result<Vec<(String, f64, f64, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                mode,
                AVG(wpm) as avg_wpm,
                AVG(accuracy) as avg_accuracy,
                COUNT(*) as total_runs
            FROM runs
            GROUP BY mode
            ORDER BY mode
            "#,
        )?;

        let summary_iter = stmt.query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;

        let mut summary = Vec::new();
        for item in summary_iter {
            summary.push(item?);
        }

        Ok(summary)
    }

    /// Write the whole history as CSV, oldest first. Returns rows written.
    pub fn export_csv<W: io::Write>(&self, out: W) -> io::Result<u64> {
        fn broken(e: impl std::error::Error + Send + Sync + 'static) -> io::Error {
            io::Error::new(io::ErrorKind::Other, e)
        }

        let runs = self.all_runs().map_err(broken)?;

        let mut writer = csv::Writer::from_writer(out);
        writer
            .write_record([
                "timestamp",
                "mode",
                "personality",
                "wpm",
                "accuracy",
                "mistakes",
                "elapsed_secs",
            ])
            .map_err(broken)?;

        let mut rows = 0u64;
        for run in runs {
            writer
                .write_record([
                    run.timestamp.to_rfc3339(),
                    run.mode.clone(),
                    run.personality.clone().unwrap_or_default(),
                    format!("{}", run.wpm),
                    format!("{}", run.accuracy),
                    format!("{}", run.mistakes),
                    format!("{:.2}", run.elapsed_secs),
                ])
                .map_err(broken)?;
            rows += 1;
        }
        writer.flush()?;

        Ok(rows)
    }

    fn all_runs(&self) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT mode, personality, wpm, accuracy, mistakes, elapsed_secs, timestamp
            FROM runs
            ORDER BY timestamp ASC
            "#,
        )?;

        let run_iter = stmt.query_map([], Self::row_to_record)?;

        let mut runs = Vec::new();
        for run in run_iter {
            runs.push(run?);
        }

        Ok(runs)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        let timestamp_str: String = row.get(6)?;
        let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
            .map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    6,
                    "timestamp".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?
            .with_timezone(&Local);

        Ok(RunRecord {
            mode: row.get(0)?,
            personality: row.get(1)?,
            wpm: row.get(2)?,
            accuracy: row.get(3)?,
            mistakes: row.get(4)?,
            elapsed_secs: row.get(5)?,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_db() -> HistoryDb {
        HistoryDb::with_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn record(mode: &str, wpm: f64, secs_offset: i64) -> RunRecord {
        RunRecord {
            mode: mode.to_string(),
            personality: Some("balanced".to_string()),
            wpm,
            accuracy: 96.0,
            mistakes: 3,
            elapsed_secs: 42.5,
            timestamp: Local.timestamp_opt(1_700_000_000 + secs_offset, 0).unwrap(),
        }
    }

    #[test]
    fn test_record_and_list_runs() {
        let db = test_db();
        db.record_run(&record("rival", 62.0, 0)).unwrap();
        db.record_run(&record("rival", 70.0, 60)).unwrap();

        let runs = db.recent_runs(10).unwrap();
        assert_eq!(runs.len(), 2);
        // Newest first.
        assert_eq!(runs[0].wpm, 70.0);
        assert_eq!(runs[1].wpm, 62.0);
        assert_eq!(runs[0].personality.as_deref(), Some("balanced"));
    }

    #[test]
    fn test_recent_runs_respects_limit() {
        let db = test_db();
        for i in 0..5 {
            db.record_run(&record("classic", 50.0 + i as f64, i)).unwrap();
        }
        assert_eq!(db.recent_runs(3).unwrap().len(), 3);
    }

    #[test]
    fn test_best_wpm_per_mode() {
        let db = test_db();
        db.record_run(&record("rival", 62.0, 0)).unwrap();
        db.record_run(&record("rival", 81.0, 1)).unwrap();
        db.record_run(&record("classic", 95.0, 2)).unwrap();

        assert_eq!(db.best_wpm("rival").unwrap(), Some(81.0));
        assert_eq!(db.best_wpm("classic").unwrap(), Some(95.0));
        assert_eq!(db.best_wpm("dynamic").unwrap(), None);
    }

    #[test]
    fn test_mode_summary_aggregates() {
        let db = test_db();
        db.record_run(&record("rival", 60.0, 0)).unwrap();
        db.record_run(&record("rival", 80.0, 1)).unwrap();
        db.record_run(&record("classic", 90.0, 2)).unwrap();

        let summary = db.mode_summary().unwrap();
        assert_eq!(summary.len(), 2);
        let rival = summary.iter().find(|(mode, ..)| mode == "rival").unwrap();
        assert_eq!(rival.1, 70.0);
        assert_eq!(rival.3, 2);
    }

    #[test]
    fn test_export_csv_one_row_per_run() {
        let db = test_db();
        db.record_run(&record("rival", 62.0, 0)).unwrap();
        db.record_run(&record("dynamic", 58.0, 1)).unwrap();

        let mut out = Vec::new();
        let rows = db.export_csv(&mut out).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("timestamp,mode"));
        assert_eq!(lines.count(), 2);
        assert!(text.contains("rival"));
        assert!(text.contains("dynamic"));
    }

    #[test]
    fn test_export_csv_empty_history() {
        let db = test_db();
        let mut out = Vec::new();
        assert_eq!(db.export_csv(&mut out).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_record_without_personality() {
        let db = test_db();
        let mut run = record("classic", 55.0, 0);
        run.personality = None;
        db.record_run(&run).unwrap();
        let runs = db.recent_runs(1).unwrap();
        assert_eq!(runs[0].personality, None);
    }
}
