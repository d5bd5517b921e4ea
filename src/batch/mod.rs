// src/batch/mod.rs
pub mod report;
pub mod state;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::{stream::FuturesUnordered, StreamExt};
use reqwest::Client;
use std::{collections::BTreeMap, path::PathBuf};
use tracing::{info, instrument, warn};

use crate::extract::{extract_table, ExtractOptions};
use crate::fetch::fetch_page;
use crate::persist::write_table_csv;
use crate::table::Table;
pub use report::{BatchReport, Entry, Outcome};
pub use state::{RequestState, RequestTracker};

/// Successfully extracted tables, by table id. Failed ids are absent.
pub type BatchResult = BTreeMap<String, Table>;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory the `<table_id>.csv` files go to when persisting.
    pub output_dir: PathBuf,
    /// Requests in flight at once. 1 keeps the run strictly sequential.
    pub concurrency: usize,
    /// Fetch each distinct URL once and extract every table requested from it.
    pub reuse_pages: bool,
    pub extract: ExtractOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            concurrency: 1,
            reuse_pages: false,
            extract: ExtractOptions::default(),
        }
    }
}

/// One fetch and the tables to extract from its page.
#[derive(Debug, Clone, PartialEq)]
struct PageJob {
    url: String,
    table_ids: Vec<String>,
}

fn plan_jobs(requests: &BTreeMap<String, String>, reuse_pages: bool) -> Vec<PageJob> {
    if !reuse_pages {
        return requests
            .iter()
            .map(|(id, url)| PageJob {
                url: url.clone(),
                table_ids: vec![id.clone()],
            })
            .collect();
    }

    let mut by_url: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (id, url) in requests {
        by_url.entry(url.as_str()).or_default().push(id.clone());
    }
    by_url
        .into_iter()
        .map(|(url, table_ids)| PageJob {
            url: url.to_string(),
            table_ids,
        })
        .collect()
}

/// Runs batches of table requests against one HTTP client.
pub struct Scraper {
    client: Client,
    options: BatchOptions,
}

impl Scraper {
    pub fn new(options: BatchOptions) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .cookie_store(true)
            .build()
            .context("building HTTP client")?;
        Ok(Self::with_client(client, options))
    }

    pub fn with_client(client: Client, options: BatchOptions) -> Self {
        Self { client, options }
    }

    /// Fetch and extract every `table_id → url` request, persisting successes to
    /// `<output_dir>/<table_id>.csv` when `persist` is set.
    ///
    /// Failures are logged and left out of the result; they never stop the batch.
    pub async fn run(&self, requests: &BTreeMap<String, String>, persist: bool) -> BatchResult {
        self.run_report(requests, persist).await.into_result()
    }

    /// Like [`Scraper::run`], keeping the failures alongside the tables.
    #[instrument(level = "info", skip_all, fields(requests = requests.len(), persist = persist))]
    pub async fn run_report(
        &self,
        requests: &BTreeMap<String, String>,
        persist: bool,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        let jobs = plan_jobs(requests, self.options.reuse_pages);
        let window = self.options.concurrency.max(1);

        let mut tasks = FuturesUnordered::new();
        for job in jobs {
            tasks.push(self.process_page(job, persist));

            // throttle concurrency
            if tasks.len() >= window {
                if let Some(done) = tasks.next().await {
                    record(&mut report, done);
                }
            }
        }
        while let Some(done) = tasks.next().await {
            record(&mut report, done);
        }

        report.finished_at = Utc::now();
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch finished"
        );
        report
    }

    async fn process_page(&self, job: PageJob, persist: bool) -> Vec<(String, Entry)> {
        let PageJob { url, table_ids } = job;
        let mut trackers: Vec<RequestTracker> = table_ids
            .iter()
            .map(|id| {
                let mut t = RequestTracker::new(id.as_str());
                t.advance(RequestState::Fetching);
                t
            })
            .collect();

        let html = match fetch_page(&self.client, &url).await {
            Ok(html) => html,
            Err(error) => {
                return table_ids
                    .into_iter()
                    .zip(trackers.iter_mut())
                    .map(|(id, tracker)| {
                        let outcome = Outcome::Failed {
                            error: error.clone(),
                            failed_in: tracker.fail(),
                        };
                        (id, Entry { url: url.clone(), outcome })
                    })
                    .collect();
            }
        };

        table_ids
            .into_iter()
            .zip(trackers.iter_mut())
            .map(|(id, tracker)| {
                let outcome = self.extract_and_store(&html, &id, persist, tracker);
                (id, Entry { url: url.clone(), outcome })
            })
            .collect()
    }

    fn extract_and_store(
        &self,
        html: &str,
        table_id: &str,
        persist: bool,
        tracker: &mut RequestTracker,
    ) -> Outcome {
        tracker.advance(RequestState::Extracting);
        let table = match extract_table(html, table_id, &self.options.extract) {
            Ok(t) => t,
            Err(error) => {
                return Outcome::Failed {
                    error,
                    failed_in: tracker.fail(),
                }
            }
        };

        if !persist {
            tracker.advance(RequestState::Succeeded);
            return Outcome::Succeeded { table, csv: None };
        }

        tracker.advance(RequestState::Persisting);
        match write_table_csv(&table, &self.options.output_dir) {
            Ok(path) => {
                tracker.advance(RequestState::Succeeded);
                Outcome::Succeeded {
                    table,
                    csv: Some(path),
                }
            }
            Err(error) => Outcome::Failed {
                error,
                failed_in: tracker.fail(),
            },
        }
    }
}

/// Log one status line per request and store its entry.
fn record(report: &mut BatchReport, done: Vec<(String, Entry)>) {
    for (id, entry) in done {
        match &entry.outcome {
            Outcome::Succeeded { table, csv } => match csv {
                Some(path) => info!(
                    table = %id,
                    url = %entry.url,
                    rows = table.len(),
                    csv = %path.display(),
                    "✓ table extracted"
                ),
                None => info!(table = %id, url = %entry.url, rows = table.len(), "✓ table extracted"),
            },
            Outcome::Failed { error, failed_in } => warn!(
                table = %id,
                url = %entry.url,
                kind = error.kind().as_str(),
                failed_in = failed_in.as_str(),
                error = %error,
                "✗ table failed"
            ),
        }
        report.entries.insert(id, entry);
    }
}
