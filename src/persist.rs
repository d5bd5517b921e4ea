use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::ScrapeError;
use crate::table::Table;

/// Whether `table_id` names a plain file inside the output directory.
pub fn is_safe_file_stem(table_id: &str) -> bool {
    !table_id.is_empty()
        && table_id != "."
        && table_id != ".."
        && !table_id.contains(['/', '\\'])
}

/// Path of the CSV file for `table_id` under `dir`.
pub fn csv_path(dir: &Path, table_id: &str) -> PathBuf {
    dir.join(format!("{}.csv", table_id))
}

/// Write `table` to `<dir>/<table.id>.csv`, replacing any existing file.
///
/// The table is written to a temporary file in `dir` first and renamed over the target, so a
/// failed write never leaves a truncated CSV behind. `dir` must already exist.
pub fn write_table_csv<P: AsRef<Path>>(table: &Table, dir: P) -> Result<PathBuf, ScrapeError> {
    let dir = dir.as_ref();
    let path = csv_path(dir, &table.id);
    if !is_safe_file_stem(&table.id) {
        return Err(ScrapeError::persistence(
            &path,
            format!("table id {:?} is not a valid file name", table.id),
        ));
    }

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ScrapeError::persistence(&path, e))?;
    table
        .write_csv(tmp.as_file_mut())
        .map_err(|e| ScrapeError::persistence(&path, e))?;
    tmp.as_file_mut()
        .flush()
        .map_err(|e| ScrapeError::persistence(&path, e))?;
    tmp.persist(&path)
        .map_err(|e| ScrapeError::persistence(&path, e.error))?;

    debug!(path = %path.display(), rows = table.len(), "wrote csv");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::{Cell, Row};
    use std::fs;
    use tempfile::tempdir;

    fn table(id: &str, n: i64) -> Table {
        Table {
            id: id.into(),
            index_name: "Rk".into(),
            columns: vec!["Squad".into()],
            rows: (1..=n)
                .map(|i| Row {
                    key: Cell::Int(i),
                    values: vec![Cell::Text(format!("Team {}", i))],
                })
                .collect(),
        }
    }

    #[test]
    fn writes_named_file_and_round_trips() {
        let dir = tempdir().unwrap();
        let path = write_table_csv(&table("stats_squads", 3), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("stats_squads.csv"));

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(back.len(), 3);
        let keys: Vec<_> = back.keys().cloned().collect();
        assert_eq!(keys, vec![Cell::Int(1), Cell::Int(2), Cell::Int(3)]);

        // only the final file remains
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempdir().unwrap();
        write_table_csv(&table("t", 5), dir.path()).unwrap();
        let path = write_table_csv(&table("t", 2), dir.path()).unwrap();
        assert_eq!(Table::read_csv(path).unwrap().len(), 2);
    }

    #[test]
    fn float_keys_stay_floats_after_read_back() {
        let dir = tempdir().unwrap();
        let mut t = table("floats", 0);
        t.rows = ["1e20", "2.0", "0.35"]
            .iter()
            .map(|k| Row {
                key: Cell::coerce(k),
                values: vec![Cell::Float(3.0)],
            })
            .collect();
        let path = write_table_csv(&t, dir.path()).unwrap();

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(
            back.keys().cloned().collect::<Vec<_>>(),
            vec![Cell::Float(1e20), Cell::Float(2.0), Cell::Float(0.35)]
        );
        assert_eq!(back.rows[1].values, vec![Cell::Float(3.0)]);
    }

    #[test]
    fn ids_that_leave_the_directory_are_rejected() {
        let root = tempdir().unwrap();
        let out = root.path().join("out");
        fs::create_dir(&out).unwrap();

        for id in ["../escaped", "a/b", "a\\b", "..", ".", ""] {
            let err = write_table_csv(&table(id, 1), &out).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Persistence, "{:?}", id);
        }
        assert!(!root.path().join("escaped.csv").exists());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        let err = write_table_csv(&table("t", 1), dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
