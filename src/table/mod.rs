// src/table/mod.rs
pub mod cell;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use std::{fs::File, io, path::Path};

pub use cell::Cell;

/// One data row: the first column's value as the key, the rest in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: Cell,
    pub values: Vec<Cell>,
}

/// A table pulled out of a page, keyed by its first column.
///
/// Keys are not unique; rows keep document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// The `id` attribute the table was selected by.
    pub id: String,
    /// Header of the first (key) column.
    pub index_name: String,
    /// Headers of the remaining columns.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(|r| &r.key)
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.values.get(idx)
    }

    /// Write header + rows as comma-separated values, key column first.
    pub fn write_csv<W: io::Write>(&self, out: W) -> Result<(), csv::Error> {
        let mut wtr = Writer::from_writer(out);
        wtr.write_record(std::iter::once(&self.index_name).chain(self.columns.iter()))?;
        for row in &self.rows {
            let record: Vec<String> = std::iter::once(&row.key)
                .chain(row.values.iter())
                .map(Cell::to_string)
                .collect();
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Read a file produced by [`Table::write_csv`] back into a table.
    /// The table id is the file stem.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
        let path = path.as_ref();
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Self::from_csv_reader(id, file).with_context(|| format!("reading {}", path.display()))
    }

    pub fn from_csv_reader<R: io::Read>(id: impl Into<String>, rdr: R) -> Result<Table> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(rdr);

        let mut headers = rdr.headers()?.iter().map(str::to_string);
        let index_name = headers.next().context("CSV has no header row")?;
        let columns: Vec<String> = headers.collect();

        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("CSV parse error at record {}", idx))?;
            let mut cells = record.iter().map(Cell::coerce);
            let key = cells.next().unwrap_or(Cell::Empty);
            rows.push(Row {
                key,
                values: cells.collect(),
            });
        }

        Ok(Table {
            id: id.into(),
            index_name,
            columns,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Table {
        Table {
            id: "stats_standard".into(),
            index_name: "Rk".into(),
            columns: vec!["Player".into(), "Nation".into(), "Gls".into()],
            rows: vec![
                Row {
                    key: Cell::Int(1),
                    values: vec![
                        Cell::Text("Max Aarons".into()),
                        Cell::Text("eng ENG".into()),
                        Cell::Int(0),
                    ],
                },
                Row {
                    key: Cell::Int(2),
                    values: vec![
                        Cell::Text("Smith, John".into()),
                        Cell::Empty,
                        Cell::Float(0.5),
                    ],
                },
            ],
        }
    }

    #[test]
    fn writes_header_and_quoted_rows() {
        let mut buf = Vec::new();
        sample().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Rk,Player,Nation,Gls\n1,Max Aarons,eng ENG,0\n2,\"Smith, John\",,0.5\n"
        );
    }

    #[test]
    fn read_back_preserves_keys_and_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats_standard.csv");
        let table = sample();
        table.write_csv(File::create(&path).unwrap()).unwrap();

        let back = Table::read_csv(&path).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.get(1, "Player"), Some(&Cell::Text("Smith, John".into())));
        assert_eq!(back.get(0, "xG"), None);
    }
}
