use crate::frame::{Page, Value};
use crate::types::{ScanRecord, TERMINAL_CURSOR};

/// One fetched page translated into typed records plus continuation state.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub records: Vec<ScanRecord>,
    pub next_cursor: String,
    pub work_done: u64,
}

/// Translate one fetched page into records, the next cursor, and the page's
/// reported work count.
///
/// Tolerates any subset of the `{key, type, metric}` columns being present:
/// a missing `type` or `metric` column yields `None` for that field on every
/// record, and a missing `key` column yields no records at all (a record
/// without a key is meaningless). Absent metadata defaults to the terminal
/// cursor and zero work. Never fails; empty input produces empty output.
pub fn parse_page(page: &Page) -> ParsedPage {
    let mut records = Vec::new();
    if let Some(keys) = page.data.column("key") {
        let kinds = page.data.column("type");
        let metrics = page.data.column("metric");
        for (row, cell) in keys.values.iter().enumerate() {
            let Some(key) = cell.as_text() else {
                continue;
            };
            records.push(ScanRecord {
                key: key.to_string(),
                kind: kinds
                    .and_then(|c| c.values.get(row))
                    .and_then(Value::as_text)
                    .map(str::to_string),
                metric: metrics.and_then(|c| c.values.get(row)).and_then(Value::as_f64),
            });
        }
    }

    let meta = page.meta.as_ref();
    let next_cursor = meta
        .and_then(|m| m.cell("cursor", 0))
        .and_then(Value::as_cursor_text)
        .unwrap_or_else(|| TERMINAL_CURSOR.to_string());
    let work_done = meta
        .and_then(|m| m.cell("count", 0))
        .and_then(Value::as_f64)
        .map(|v| v.max(0.0) as u64)
        .unwrap_or(0);

    ParsedPage {
        records,
        next_cursor,
        work_done,
    }
}
