// src/extract/mod.rs
pub mod grid;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, trace};

use crate::error::ScrapeError;
use crate::table::{Cell, Row, Table};
use grid::{expand_spans, is_header_row};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("table selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Skip body rows that repeat a header row (FBref repeats its header every 25 rows).
    pub drop_repeated_headers: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            drop_repeated_headers: true,
        }
    }
}

/// Direct rows of one table, split into header and body, never descending into nested tables.
struct Sections<'a> {
    head: Vec<ElementRef<'a>>,
    body: Vec<ElementRef<'a>>,
    foot: Vec<ElementRef<'a>>,
}

fn child_rows<'a>(section: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
}

fn sections<'a>(table: &ElementRef<'a>) -> Sections<'a> {
    let mut s = Sections {
        head: Vec::new(),
        body: Vec::new(),
        foot: Vec::new(),
    };
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "thead" => s.head.extend(child_rows(child)),
            "tbody" => s.body.extend(child_rows(child)),
            "tfoot" => s.foot.extend(child_rows(child)),
            "tr" => s.body.push(child),
            _ => {}
        }
    }

    // Without a <thead>, leading all-<th> rows are the header.
    if s.head.is_empty() {
        let n = s.body.iter().take_while(|r| is_header_row(r)).count();
        s.head = s.body.drain(..n).collect();
    }
    s
}

/// One label per column: the distinct non-empty labels of each header level, top first.
fn flatten_headers(head: &[Vec<String>], width: usize) -> Vec<String> {
    (0..width)
        .map(|col| {
            let mut parts: Vec<&str> = Vec::new();
            for level in head {
                if let Some(label) = level.get(col).map(String::as_str) {
                    if !label.is_empty() && !parts.contains(&label) {
                        parts.push(label);
                    }
                }
            }
            if parts.is_empty() {
                format!("Unnamed: {}", col)
            } else {
                parts.join("_")
            }
        })
        .collect()
}

fn repeats_header(line: &[String], head: &[Vec<String>]) -> bool {
    head.iter().any(|h| {
        let n = h.len().max(line.len());
        (0..n).all(|i| {
            line.get(i).map_or("", String::as_str) == h.get(i).map_or("", String::as_str)
        })
    })
}

/// Locate `<table id="{table_id}">` in `html` and project it into a [`Table`] keyed by its
/// first column. The first matching table in document order wins.
#[instrument(level = "debug", skip(html, opts), fields(bytes = html.len()))]
pub fn extract_table(
    html: &str,
    table_id: &str,
    opts: &ExtractOptions,
) -> Result<Table, ScrapeError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&TABLE)
        .find(|t| t.value().attr("id") == Some(table_id))
        .ok_or_else(|| ScrapeError::parse(table_id, "no table with this id in the document"))?;

    let Sections { head, body, foot } = sections(&table);
    let head = expand_spans(&head);
    let mut body_lines = expand_spans(&body);
    body_lines.extend(expand_spans(&foot));

    if head.is_empty() && body_lines.is_empty() {
        return Err(ScrapeError::parse(table_id, "table has no rows"));
    }

    let width = if head.is_empty() {
        body_lines.iter().map(Vec::len).max().unwrap_or(0)
    } else {
        head.iter().map(Vec::len).max().unwrap_or(0)
    };
    let mut names: Vec<String> = if head.is_empty() {
        (0..width).map(|i| i.to_string()).collect()
    } else {
        flatten_headers(&head, width)
    };
    trace!(?names, "columns");

    let mut rows = Vec::with_capacity(body_lines.len());
    for (idx, mut line) in body_lines.into_iter().enumerate() {
        if opts.drop_repeated_headers && repeats_header(&line, &head) {
            trace!(row = idx, "skipping repeated header row");
            continue;
        }
        if line.len() > width {
            return Err(ScrapeError::parse(
                table_id,
                format!(
                    "row {} has {} cells but the header has {} columns",
                    idx,
                    line.len(),
                    width
                ),
            ));
        }
        line.resize(width, String::new());

        let mut cells = line.iter().map(|s| Cell::coerce(s));
        let key = cells.next().unwrap_or(Cell::Empty);
        rows.push(Row {
            key,
            values: cells.collect(),
        });
    }

    let index_name = names.remove(0);
    debug!(
        table = table_id,
        rows = rows.len(),
        columns = width,
        "extracted table"
    );

    Ok(Table {
        id: table_id.to_string(),
        index_name,
        columns: names,
        rows,
    })
}
