pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod persist;
pub mod table;

pub use batch::{BatchOptions, BatchReport, BatchResult, Outcome, RequestState, Scraper};
pub use error::{ErrorKind, ScrapeError};
pub use extract::{extract_table, ExtractOptions};
pub use fetch::{decomment, fetch_page};
pub use table::{Cell, Row, Table};
