use anyhow::{Context, Result};
use clap::Parser;
use fbref_tables::{
    config::{PageSpec, ScrapeConfig, DEFAULT_TABLES, DEFAULT_URL},
    Scraper,
};
use std::{collections::BTreeMap, fs, path::PathBuf, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Pull named tables out of FBref pages and save them as CSV.
///
/// With no tables given on the command line or in a config file, scrapes the
/// Big 5 European Leagues player statistics tables.
#[derive(Parser, Debug)]
#[command(name = "fbref_tables", version)]
struct Cli {
    /// YAML config file
    #[arg(short, long, env = "FBREF_CONFIG")]
    config: Option<PathBuf>,

    /// Page the --table ids are extracted from
    #[arg(short, long)]
    url: Option<String>,

    /// Table id to extract from --url (repeatable)
    #[arg(short, long = "table", value_name = "ID")]
    tables: Vec<String>,

    /// Extra table with its own page (repeatable)
    #[arg(long = "map", value_name = "ID=URL", value_parser = parse_pair)]
    map: Vec<(String, String)>,

    /// Directory the CSV files are written to
    #[arg(short, long, env = "FBREF_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Extract only, write no CSV files
    #[arg(long)]
    no_save: bool,

    /// Tables fetched at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Fetch each distinct page once
    #[arg(long)]
    reuse_pages: bool,

    /// Keep body rows that repeat the header
    #[arg(long)]
    keep_repeated_headers: bool,

    /// Write a JSON summary of the run here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `info,fbref_tables=trace`
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (id, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=URL, got {:?}", s))?;
    if id.is_empty() || url.is_empty() {
        return Err(format!("expected ID=URL, got {:?}", s));
    }
    Ok((id.to_string(), url.to_string()))
}

impl Cli {
    /// The command-line flags as a config layer.
    fn overlay(&self) -> ScrapeConfig {
        let mut pages = Vec::new();
        if self.url.is_some() || !self.tables.is_empty() {
            let tables = if self.tables.is_empty() {
                DEFAULT_TABLES.iter().map(|t| t.to_string()).collect()
            } else {
                self.tables.clone()
            };
            pages.push(PageSpec {
                url: self.url.clone().unwrap_or_else(|| DEFAULT_URL.to_string()),
                tables,
            });
        }

        ScrapeConfig {
            output_dir: self.out_dir.clone(),
            persist: self.no_save.then_some(false),
            concurrency: self.concurrency,
            reuse_pages: self.reuse_pages.then_some(true),
            drop_repeated_headers: self.keep_repeated_headers.then_some(false),
            report: self.report.clone(),
            tables: self.map.iter().cloned().collect::<BTreeMap<_, _>>(),
            pages,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let env = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level).context("parsing --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) resolve config ───────────────────────────────────────────
    let base = match &cli.config {
        Some(path) => ScrapeConfig::load(path)?,
        None => ScrapeConfig::default(),
    };
    let cfg = base.merge(cli.overlay())?;
    let cfg = if cfg.has_requests() {
        cfg
    } else {
        info!("no tables requested; using the Big 5 player tables");
        ScrapeConfig::defaults().merge(cfg)?
    };
    let settings = cfg.validate()?;

    if settings.persist {
        let dir = &settings.options.output_dir;
        fs::create_dir_all(dir).with_context(|| format!("creating output dir {:?}", dir))?;
    }

    // ─── 3) run ──────────────────────────────────────────────────────
    info!(
        tables = settings.requests.len(),
        persist = settings.persist,
        out_dir = %settings.options.output_dir.display(),
        "startup"
    );
    let start = Instant::now();
    let scraper = Scraper::new(settings.options.clone())?;
    let report = scraper
        .run_report(&settings.requests, settings.persist)
        .await;

    if let Some(path) = &settings.report {
        match report.write_json(path) {
            Ok(()) => info!(path = %path.display(), "wrote run report"),
            Err(e) => warn!("failed to write run report: {:#}", e),
        }
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        elapsed = ?start.elapsed(),
        "all done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs() {
        assert_eq!(
            parse_pair("stats_keeper=http://x/k").unwrap(),
            ("stats_keeper".to_string(), "http://x/k".to_string())
        );
        assert_eq!(
            parse_pair("t=http://x/?a=b").unwrap().1,
            "http://x/?a=b".to_string()
        );
        assert!(parse_pair("no-separator").is_err());
        assert!(parse_pair("=http://x").is_err());
    }

    #[test]
    fn tables_without_url_use_default_page() {
        let cli = Cli::parse_from(["fbref_tables", "-t", "stats_keeper", "--no-save"]);
        let cfg = cli.overlay();
        assert_eq!(cfg.persist, Some(false));
        assert_eq!(cfg.pages.len(), 1);
        assert_eq!(cfg.pages[0].url, DEFAULT_URL);
        assert_eq!(cfg.pages[0].tables, vec!["stats_keeper"]);
    }

    #[test]
    fn url_without_tables_uses_default_ids() {
        let cli = Cli::parse_from(["fbref_tables", "--url", "http://x/p", "--reuse-pages"]);
        let cfg = cli.overlay();
        assert_eq!(cfg.pages[0].tables.len(), DEFAULT_TABLES.len());
        assert_eq!(cfg.reuse_pages, Some(true));
        assert_eq!(cfg.persist, None);
    }

    #[test]
    fn map_clashing_with_config_file_is_an_error() {
        let file = ScrapeConfig::from_yaml_str("tables: {stats_keeper: http://x/file}").unwrap();
        let cli = Cli::parse_from(["fbref_tables", "--map", "stats_keeper=http://x/cli"]);
        assert!(file.merge(cli.overlay()).is_err());
    }

    #[test]
    fn bare_invocation_requests_nothing() {
        let cli = Cli::parse_from(["fbref_tables", "--map", "a=http://x/a"]);
        let cfg = cli.overlay();
        assert!(cfg.pages.is_empty());
        assert_eq!(cfg.tables["a"], "http://x/a");
        assert!(!Cli::parse_from(["fbref_tables"]).overlay().has_requests());
    }
}
