// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tabular sink for staging and history tables.
//!
//! A table is an ordered list of rows of cell text; the first row is the
//! header. The JSONL store keeps one table per `<name>.jsonl` file, one JSON
//! array per line, and writes each row with a single append.

use crate::error::AppError;
use dashmap::DashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// One table row. Empty strings are empty cells.
pub type Row = Vec<String>;

/// Row-oriented table storage.
pub trait TableSink: Send + Sync {
    fn table_exists(&self, table: &str) -> Result<bool, AppError>;

    /// Create an empty table; a no-op when it already exists.
    fn create_table(&self, table: &str) -> Result<(), AppError>;

    /// Append a row, creating the table if needed.
    fn append_row(&self, table: &str, row: &[String]) -> Result<(), AppError>;

    fn append_rows(&self, table: &str, rows: &[Row]) -> Result<(), AppError> {
        for row in rows {
            self.append_row(table, row)?;
        }
        Ok(())
    }

    /// All rows including the header; empty when the table does not exist.
    fn read_all_rows(&self, table: &str) -> Result<Vec<Row>, AppError>;

    /// Remove every row (header included), keeping the table.
    fn clear_all_rows(&self, table: &str) -> Result<(), AppError>;

    fn row_count(&self, table: &str) -> Result<usize, AppError>;
}

/// File-backed tables under a data directory.
#[derive(Debug, Clone)]
pub struct JsonlTableStore {
    dir: PathBuf,
}

impl JsonlTableStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn table_path(&self, table: &str) -> Result<PathBuf, AppError> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ');
        if !valid {
            return Err(AppError::Storage(format!("Invalid table name: {:?}", table)));
        }
        Ok(self.dir.join(format!("{}.jsonl", table)))
    }

    /// Open a table for appending, positioned at the end.
    ///
    /// A torn trailing line left by an interrupted write is truncated away
    /// first, so new rows always start on a fresh line.
    fn open_for_append(&self, table: &str) -> Result<File, AppError> {
        let path = self.table_path(table)?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let len = file.metadata()?.len();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;

            if last[0] != b'\n' {
                let content = fs::read(&path)?;
                let keep = content
                    .iter()
                    .rposition(|&b| b == b'\n')
                    .map_or(0, |i| i as u64 + 1);
                file.set_len(keep)?;
                tracing::warn!(
                    table,
                    dropped_bytes = len - keep,
                    "Truncated incomplete trailing row before append"
                );
            }
        }

        file.seek(SeekFrom::End(0))?;
        Ok(file)
    }
}

impl TableSink for JsonlTableStore {
    fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        Ok(self.table_path(table)?.exists())
    }

    fn create_table(&self, table: &str) -> Result<(), AppError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.table_path(table)?)?;
        Ok(())
    }

    fn append_row(&self, table: &str, row: &[String]) -> Result<(), AppError> {
        let mut line = serde_json::to_string(row)?;
        line.push('\n');

        let mut file = self.open_for_append(table)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn append_rows(&self, table: &str, rows: &[Row]) -> Result<(), AppError> {
        let mut file = self.open_for_append(table)?;

        for row in rows {
            let mut line = serde_json::to_string(row)?;
            line.push('\n');
            file.write_all(line.as_bytes())?;
        }
        file.flush()?;
        Ok(())
    }

    fn read_all_rows(&self, table: &str) -> Result<Vec<Row>, AppError> {
        let path = self.table_path(table)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let complete = content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        let mut rows = Vec::with_capacity(lines.len());

        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Row>(line) {
                Ok(row) => rows.push(row),
                // An unterminated last line is a write that never finished
                Err(e) if !complete && index == lines.len() - 1 => {
                    tracing::warn!(table, error = %e, "Ignoring incomplete trailing row");
                }
                Err(e) => {
                    return Err(AppError::Storage(format!(
                        "Corrupt row {} in table {}: {}",
                        index + 1,
                        table,
                        e
                    )))
                }
            }
        }

        Ok(rows)
    }

    fn clear_all_rows(&self, table: &str) -> Result<(), AppError> {
        fs::write(self.table_path(table)?, "")?;
        Ok(())
    }

    fn row_count(&self, table: &str) -> Result<usize, AppError> {
        Ok(self.read_all_rows(table)?.len())
    }
}

/// In-memory tables.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: DashMap<String, Vec<Row>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableSink for MemoryTableStore {
    fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        Ok(self.tables.contains_key(table))
    }

    fn create_table(&self, table: &str) -> Result<(), AppError> {
        self.tables.entry(table.to_string()).or_default();
        Ok(())
    }

    fn append_row(&self, table: &str, row: &[String]) -> Result<(), AppError> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.to_vec());
        Ok(())
    }

    fn read_all_rows(&self, table: &str) -> Result<Vec<Row>, AppError> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default())
    }

    fn clear_all_rows(&self, table: &str) -> Result<(), AppError> {
        self.tables.insert(table.to_string(), Vec::new());
        Ok(())
    }

    fn row_count(&self, table: &str) -> Result<usize, AppError> {
        Ok(self.tables.get(table).map(|rows| rows.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_jsonl_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlTableStore::new(temp_dir.path()).unwrap();

        assert!(!store.table_exists("Data").unwrap());
        assert!(store.read_all_rows("Data").unwrap().is_empty());

        store.append_row("Data", &row(&["id", "name"])).unwrap();
        store
            .append_rows(
                "Data",
                &[row(&["1", "Morning, \"easy\" run"]), row(&["2", ""])],
            )
            .unwrap();

        assert!(store.table_exists("Data").unwrap());
        assert_eq!(store.row_count("Data").unwrap(), 3);
        let rows = store.read_all_rows("Data").unwrap();
        assert_eq!(rows[1], row(&["1", "Morning, \"easy\" run"]));
        assert_eq!(rows[2], row(&["2", ""]));
    }

    #[test]
    fn test_jsonl_clear_keeps_table() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlTableStore::new(temp_dir.path()).unwrap();
        store.append_row("Splits", &row(&["a"])).unwrap();

        store.clear_all_rows("Splits").unwrap();
        assert!(store.table_exists("Splits").unwrap());
        assert_eq!(store.row_count("Splits").unwrap(), 0);
    }

    #[test]
    fn test_jsonl_ignores_unterminated_trailing_row() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlTableStore::new(temp_dir.path()).unwrap();
        store.append_row("Data", &row(&["id"])).unwrap();

        let path = temp_dir.path().join("Data.jsonl");
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("[\"1\", \"tru");
        fs::write(&path, content).unwrap();

        assert_eq!(store.read_all_rows("Data").unwrap(), vec![row(&["id"])]);
    }

    #[test]
    fn test_jsonl_append_after_torn_row_starts_fresh_line() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlTableStore::new(temp_dir.path()).unwrap();
        let path = temp_dir.path().join("Data.jsonl");
        fs::write(&path, "[\"id\"]\n[\"1\"]\n[\"2\"").unwrap();

        store.append_rows("Data", &[row(&["2"]), row(&["3"])]).unwrap();
        store.append_row("Data", &row(&["4"])).unwrap();

        assert_eq!(
            store.read_all_rows("Data").unwrap(),
            vec![row(&["id"]), row(&["1"]), row(&["2"]), row(&["3"]), row(&["4"])]
        );
        assert!(fs::read_to_string(&path).unwrap().ends_with("[\"4\"]\n"));
    }

    #[test]
    fn test_jsonl_append_after_torn_first_row() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlTableStore::new(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("Data.jsonl"), "[\"i").unwrap();

        store.append_row("Data", &row(&["id"])).unwrap();
        assert_eq!(store.read_all_rows("Data").unwrap(), vec![row(&["id"])]);
    }

    #[test]
    fn test_jsonl_rejects_corrupt_middle_row() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlTableStore::new(temp_dir.path()).unwrap();
        fs::write(temp_dir.path().join("Data.jsonl"), "[\"id\"]\nbroken\n[\"1\"]\n").unwrap();

        assert!(matches!(
            store.read_all_rows("Data"),
            Err(AppError::Storage(_))
        ));
    }

    #[test]
    fn test_jsonl_rejects_path_like_table_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonlTableStore::new(temp_dir.path()).unwrap();
        assert!(store.append_row("../escape", &row(&["x"])).is_err());
    }

    #[test]
    fn test_memory_store_behaves_like_file_store() {
        let store = MemoryTableStore::new();
        assert!(!store.table_exists("Data").unwrap());
        store.create_table("Data").unwrap();
        assert!(store.table_exists("Data").unwrap());
        assert_eq!(store.row_count("Data").unwrap(), 0);

        store.append_row("Data", &row(&["id"])).unwrap();
        store.append_row("Data", &row(&["1"])).unwrap();
        assert_eq!(store.read_all_rows("Data").unwrap().len(), 2);

        store.clear_all_rows("Data").unwrap();
        assert_eq!(store.row_count("Data").unwrap(), 0);
    }
}
