// src/config.rs
//! Run configuration: which tables to pull from which pages, and where to put them.
//!
//! A YAML file looks like
//!
//! ```yaml
//! output_dir: datasets
//! persist: true
//! concurrency: 1
//! reuse_pages: true
//! drop_repeated_headers: true
//! pages:
//!   - url: https://fbref.com/en/comps/Big5/stats/players/Big-5-European-Leagues-Stats
//!     tables: [stats_standard, stats_shooting]
//! tables:
//!   stats_squads_standard_for: https://fbref.com/en/comps/Big5/stats/squads/Big-5-European-Leagues-Stats
//! ```
//!
//! `pages` and `tables` are merged into a single `table_id → url` map.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};

use crate::batch::BatchOptions;
use crate::extract::ExtractOptions;
use crate::persist::is_safe_file_stem;

pub const DEFAULT_URL: &str =
    "https://fbref.com/en/comps/Big5/stats/players/Big-5-European-Leagues-Stats";

pub const DEFAULT_TABLES: &[&str] = &[
    "stats_standard",
    "stats_misc",
    "stats_possession",
    "stats_shooting",
    "stats_passing",
    "stats_gca",
    "stats_defense",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageSpec {
    pub url: String,
    pub tables: Vec<String>,
}

/// Everything is optional so a file, the CLI and the defaults can be layered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeConfig {
    pub output_dir: Option<PathBuf>,
    pub persist: Option<bool>,
    pub concurrency: Option<usize>,
    pub reuse_pages: Option<bool>,
    pub drop_repeated_headers: Option<bool>,
    pub report: Option<PathBuf>,
    pub tables: BTreeMap<String, String>,
    pub pages: Vec<PageSpec>,
}

/// A validated configuration, ready to run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub requests: BTreeMap<String, String>,
    pub persist: bool,
    pub report: Option<PathBuf>,
    pub options: BatchOptions,
}

impl ScrapeConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).context("parsing YAML config")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {:?}", path))
    }

    /// The FBref Big 5 player tables, saved to the current directory.
    pub fn defaults() -> Self {
        Self {
            persist: Some(true),
            pages: vec![PageSpec {
                url: DEFAULT_URL.to_string(),
                tables: DEFAULT_TABLES.iter().map(|t| t.to_string()).collect(),
            }],
            ..Self::default()
        }
    }

    pub fn has_requests(&self) -> bool {
        !self.tables.is_empty() || self.pages.iter().any(|p| !p.tables.is_empty())
    }

    /// Layer `over` on top of `self`: set scalars win, requests are appended.
    ///
    /// An id present in both `tables` maps is an error, as it is in [`Self::requests`].
    pub fn merge(mut self, over: ScrapeConfig) -> Result<Self> {
        self.output_dir = over.output_dir.or(self.output_dir);
        self.persist = over.persist.or(self.persist);
        self.concurrency = over.concurrency.or(self.concurrency);
        self.reuse_pages = over.reuse_pages.or(self.reuse_pages);
        self.drop_repeated_headers = over.drop_repeated_headers.or(self.drop_repeated_headers);
        self.report = over.report.or(self.report);
        for (id, url) in over.tables {
            if self.tables.contains_key(&id) {
                bail!("table {:?} is requested more than once", id);
            }
            self.tables.insert(id, url);
        }
        self.pages.extend(over.pages);
        Ok(self)
    }

    /// Merge `pages` and `tables` into one map, rejecting duplicates and blanks.
    pub fn requests(&self) -> Result<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        let pairs = self.tables.iter().map(|(id, url)| (id, url)).chain(
            self.pages
                .iter()
                .flat_map(|p| p.tables.iter().map(move |id| (id, &p.url))),
        );
        for (id, url) in pairs {
            if id.trim().is_empty() {
                bail!("empty table id for {}", url);
            }
            if !is_safe_file_stem(id) {
                bail!("table id {:?} cannot be used as a file name", id);
            }
            if url.trim().is_empty() {
                bail!("table {:?} has an empty url", id);
            }
            if out.insert(id.clone(), url.clone()).is_some() {
                bail!("table {:?} is requested more than once", id);
            }
        }
        Ok(out)
    }

    pub fn validate(self) -> Result<Settings> {
        let requests = self.requests()?;
        if requests.is_empty() {
            bail!("no tables requested");
        }
        let concurrency = self.concurrency.unwrap_or(1);
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }

        let defaults = BatchOptions::default();
        Ok(Settings {
            requests,
            persist: self.persist.unwrap_or(true),
            report: self.report,
            options: BatchOptions {
                output_dir: self.output_dir.unwrap_or(defaults.output_dir),
                concurrency,
                reuse_pages: self.reuse_pages.unwrap_or(defaults.reuse_pages),
                extract: ExtractOptions {
                    drop_repeated_headers: self
                        .drop_repeated_headers
                        .unwrap_or(defaults.extract.drop_repeated_headers),
                },
            },
        })
    }
}
