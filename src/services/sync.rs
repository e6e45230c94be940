// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only reconciliation from staging tables into history tables.
//!
//! History rows are never rewritten or removed. A staging row is appended
//! only when its composite key is not yet present; rows with an empty key
//! cell are ignored entirely.

use crate::db::{Row, TableSink};
use crate::error::AppError;
use std::collections::HashSet;

/// Key separator; matches how keys are compared as text.
const KEY_SEPARATOR: char = '|';

/// Composite key of a row, or `None` if any key cell is missing or empty.
fn row_key(row: &[String], key_columns: &[usize]) -> Option<String> {
    let mut key = String::new();
    for (i, &column) in key_columns.iter().enumerate() {
        let cell = row.get(column).map(|c| c.trim()).filter(|c| !c.is_empty())?;
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(cell);
    }
    Some(key)
}

/// Rows of `source` (data rows, header excluded) whose key is absent from
/// `destination` (data rows, header excluded), in source order.
///
/// A key repeated inside `source` is selected once.
pub fn select_new_rows(source: &[Row], destination: &[Row], key_columns: &[usize]) -> Vec<Row> {
    let mut seen: HashSet<String> = destination
        .iter()
        .filter_map(|row| row_key(row, key_columns))
        .collect();

    source
        .iter()
        .filter(|row| match row_key(row, key_columns) {
            Some(key) => seen.insert(key),
            None => false,
        })
        .cloned()
        .collect()
}

/// Merge `source_table` into `destination_table`, returning rows appended.
///
/// A missing or empty destination is created and seeded with the source
/// header before any data row is appended.
pub fn merge_append_only(
    sink: &dyn TableSink,
    source_table: &str,
    destination_table: &str,
    key_columns: &[usize],
) -> Result<usize, AppError> {
    let source = sink.read_all_rows(source_table)?;
    let Some((header, source_rows)) = source.split_first() else {
        tracing::debug!(source_table, "Staging table empty, nothing to merge");
        return Ok(0);
    };

    let destination = sink.read_all_rows(destination_table)?;
    let destination_rows = if destination.is_empty() {
        sink.create_table(destination_table)?;
        sink.append_row(destination_table, header)?;
        tracing::info!(destination_table, "Created history table");
        &[][..]
    } else {
        &destination[1..]
    };

    let new_rows = select_new_rows(source_rows, destination_rows, key_columns);
    if !new_rows.is_empty() {
        sink.append_rows(destination_table, &new_rows)?;
    }

    tracing::info!(
        source_table,
        destination_table,
        staged = source_rows.len(),
        appended = new_rows.len(),
        "Append-only merge complete"
    );
    Ok(new_rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryTableStore;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_row_key_requires_every_column() {
        assert_eq!(row_key(&row(&["1", "2", "x"]), &[0, 1]), Some("1|2".to_string()));
        assert_eq!(row_key(&row(&["1", ""]), &[0, 1]), None);
        assert_eq!(row_key(&row(&["1"]), &[0, 1]), None);
        assert_eq!(row_key(&row(&["  "]), &[0]), None);
    }

    #[test]
    fn test_select_skips_existing_keys() {
        let destination = vec![row(&["1", "1", "old"])];
        let source = vec![row(&["1", "1", "new"]), row(&["1", "2", "new"])];

        let selected = select_new_rows(&source, &destination, &[0, 1]);
        assert_eq!(selected, vec![row(&["1", "2", "new"])]);
    }

    #[test]
    fn test_select_skips_keyless_and_repeated_rows() {
        let source = vec![
            row(&["", "a"]),
            row(&["5", "b"]),
            row(&["5", "c"]),
            row(&["6", "d"]),
        ];
        let selected = select_new_rows(&source, &[], &[0]);
        assert_eq!(selected, vec![row(&["5", "b"]), row(&["6", "d"])]);
    }

    #[test]
    fn test_merge_creates_destination_with_header() {
        let sink = MemoryTableStore::new();
        sink.append_rows("Splits", &[row(&["activity_id", "km"]), row(&["1", "1"])])
            .unwrap();

        let appended = merge_append_only(&sink, "Splits", "SplitsDataStored", &[0, 1]).unwrap();

        assert_eq!(appended, 1);
        assert_eq!(
            sink.read_all_rows("SplitsDataStored").unwrap(),
            vec![row(&["activity_id", "km"]), row(&["1", "1"])]
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let sink = MemoryTableStore::new();
        sink.append_rows("StravaData", &[row(&["id"]), row(&["1"]), row(&["2"])])
            .unwrap();

        assert_eq!(merge_append_only(&sink, "StravaData", "Data", &[0]).unwrap(), 2);
        assert_eq!(merge_append_only(&sink, "StravaData", "Data", &[0]).unwrap(), 0);
        assert_eq!(sink.row_count("Data").unwrap(), 3);
    }

    #[test]
    fn test_merge_never_rewrites_history() {
        let sink = MemoryTableStore::new();
        sink.append_rows("Data", &[row(&["id", "name"]), row(&["1", "original"])])
            .unwrap();
        sink.append_rows(
            "StravaData",
            &[row(&["id", "name"]), row(&["1", "renamed"]), row(&["2", "new"])],
        )
        .unwrap();

        merge_append_only(&sink, "StravaData", "Data", &[0]).unwrap();

        assert_eq!(
            sink.read_all_rows("Data").unwrap(),
            vec![
                row(&["id", "name"]),
                row(&["1", "original"]),
                row(&["2", "new"])
            ]
        );
    }

    #[test]
    fn test_merge_with_empty_staging_does_nothing() {
        let sink = MemoryTableStore::new();
        assert_eq!(merge_append_only(&sink, "StravaData", "Data", &[0]).unwrap(), 0);
        assert!(!sink.table_exists("Data").unwrap());
    }
}
