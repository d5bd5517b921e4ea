use scraper::ElementRef;

// Clamps used by browsers for span attributes.
const MAX_COLSPAN: usize = 1000;
const MAX_ROWSPAN: usize = 65534;

/// Direct `td`/`th` children of a `tr`.
pub fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

/// True when a row has cells and every one of them is a `th`.
pub fn is_header_row(row: &ElementRef) -> bool {
    let cells = row_cells(row);
    !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th")
}

/// All descendant text of a cell, `&nbsp;` folded to a space, whitespace collapsed.
pub fn cell_text(cell: &ElementRef) -> String {
    let raw: String = cell.text().collect();
    let mut out = String::with_capacity(raw.len());
    for word in raw.split(|c: char| c.is_whitespace() || c == '\u{a0}') {
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn span(cell: &ElementRef, attr: &str, max: usize) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, max)
}

/// Lay the rows of one table section out as a rectangular-ish grid of cell texts,
/// repeating the text of cells that span several columns or rows.
///
/// Rows without any cells are dropped. Row lengths may still differ; the caller decides
/// how to reconcile them with the header width.
pub fn expand_spans(rows: &[ElementRef]) -> Vec<Vec<String>> {
    let mut out = Vec::with_capacity(rows.len());
    // Per column: rows still covered by a rowspan above, and the text to repeat.
    let mut carry: Vec<(usize, String)> = Vec::new();

    for row in rows {
        let cells = row_cells(row);
        if cells.is_empty() {
            continue;
        }

        let mut line: Vec<String> = Vec::new();
        let mut col = 0;
        let mut cells = cells.into_iter();

        loop {
            if col < carry.len() && carry[col].0 > 0 {
                carry[col].0 -= 1;
                line.push(carry[col].1.clone());
                col += 1;
                continue;
            }
            let Some(cell) = cells.next() else { break };

            let text = cell_text(&cell);
            let colspan = span(&cell, "colspan", MAX_COLSPAN);
            let rowspan = span(&cell, "rowspan", MAX_ROWSPAN);
            for _ in 0..colspan {
                if carry.len() <= col {
                    carry.resize(col + 1, (0, String::new()));
                }
                carry[col] = (rowspan - 1, text.clone());
                line.push(text.clone());
                col += 1;
            }
        }

        // Rowspans from above that reach past the last explicit cell.
        if let Some(last) = carry.iter().rposition(|(left, _)| *left > 0) {
            while col <= last {
                if carry[col].0 > 0 {
                    carry[col].0 -= 1;
                    line.push(carry[col].1.clone());
                } else {
                    line.push(String::new());
                }
                col += 1;
            }
        }

        out.push(line);
    }

    out
}
