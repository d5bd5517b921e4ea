use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use super::state::RequestState;
use super::BatchResult;
use crate::error::{ErrorKind, ScrapeError};
use crate::table::Table;

/// Terminal result of one table request.
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeeded {
        table: Table,
        /// Set when the table was written to disk.
        csv: Option<PathBuf>,
    },
    Failed {
        error: ScrapeError,
        /// State the request was in when it failed.
        failed_in: RequestState,
    },
}

impl Outcome {
    pub fn state(&self) -> RequestState {
        match self {
            Outcome::Succeeded { .. } => RequestState::Succeeded,
            Outcome::Failed { .. } => RequestState::Failed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub url: String,
    pub outcome: Outcome,
}

/// Every request of one run, with its outcome.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entries: BTreeMap<String, Entry>,
}

impl BatchReport {
    pub(crate) fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            entries: BTreeMap::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.tables().count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.entries.iter().filter_map(|(id, e)| match &e.outcome {
            Outcome::Succeeded { table, .. } => Some((id, table)),
            Outcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&String, &ScrapeError)> {
        self.entries.iter().filter_map(|(id, e)| match &e.outcome {
            Outcome::Failed { error, .. } => Some((id, error)),
            Outcome::Succeeded { .. } => None,
        })
    }

    /// Keep only the successes.
    pub fn into_result(self) -> BatchResult {
        self.entries
            .into_iter()
            .filter_map(|(id, e)| match e.outcome {
                Outcome::Succeeded { table, .. } => Some((id, table)),
                Outcome::Failed { .. } => None,
            })
            .collect()
    }

    pub fn summary(&self) -> Summary<'_> {
        let tables = self
            .entries
            .iter()
            .map(|(id, e)| {
                let mut line = SummaryLine {
                    table_id: id,
                    url: &e.url,
                    status: e.outcome.state(),
                    rows: None,
                    csv: None,
                    error_kind: None,
                    error: None,
                    failed_in: None,
                };
                match &e.outcome {
                    Outcome::Succeeded { table, csv } => {
                        line.rows = Some(table.len());
                        line.csv = csv.as_deref();
                    }
                    Outcome::Failed { error, failed_in } => {
                        line.error_kind = Some(error.kind());
                        line.error = Some(error.to_string());
                        line.failed_in = Some(*failed_in);
                    }
                }
                line
            })
            .collect();

        Summary {
            started_at: self.started_at,
            finished_at: self.finished_at,
            requested: self.entries.len(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            tables,
        }
    }

    /// Write the run summary as pretty JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.summary())?;
        fs::write(path, json + "\n").with_context(|| format!("writing report {:?}", path))?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub tables: Vec<SummaryLine<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SummaryLine<'a> {
    pub table_id: &'a str,
    pub url: &'a str,
    pub status: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_in: Option<RequestState>,
}
