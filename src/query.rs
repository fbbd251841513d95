use std::future::Future;

use anyhow::{anyhow, Result};

use crate::frame::{Column, Frame, Page, Value};
use crate::types::{ScanConfig, TERMINAL_CURSOR};

/// The external query boundary: issue a cursor-paginated scan request or a
/// one-shot keyspace count. Issuance is synchronous, resolution is
/// asynchronous, and there is no delivery-order guarantee between
/// independently issued calls. Either call may fail or resolve with partial
/// data; callers must treat missing columns as "no data", never as a hard
/// failure.
pub trait QuerySource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        cursor: &str,
        config: &ScanConfig,
    ) -> impl Future<Output = Result<Page>> + Send;

    fn fetch_total(&self) -> impl Future<Output = Result<u64>> + Send;
}

/// An in-memory keyspace implementing the scan protocol, used by the demo
/// binary and the integration tests. Cursor tokens are element offsets
/// encoded as text, with `"0"` doubling as the start token and the terminal
/// token, matching the real protocol's convention.
pub struct MemorySource {
    entries: Vec<MemoryEntry>,
}

#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub key: String,
    pub kind: String,
    pub metric: f64,
}

impl MemorySource {
    pub fn new(entries: Vec<MemoryEntry>) -> Self {
        Self { entries }
    }

    /// Deterministic synthetic keyspace for demos: `n` keys spread across a
    /// few namespaces and value kinds, with a scrambled but reproducible
    /// per-key byte size.
    pub fn synthetic(n: usize) -> Self {
        const NAMESPACES: &[&str] = &["user", "session", "cache", "queue", "metrics"];
        const KINDS: &[&str] = &["string", "hash", "list", "set", "zset"];
        let entries = (0..n)
            .map(|i| MemoryEntry {
                key: format!("{}:{:06}", NAMESPACES[i % NAMESPACES.len()], i),
                kind: KINDS[i / NAMESPACES.len() % KINDS.len()].to_string(),
                metric: ((i as u64).wrapping_mul(2_654_435_761) % 1_048_576) as f64,
            })
            .collect();
        Self { entries }
    }
}

impl QuerySource for MemorySource {
    async fn fetch_page(&self, cursor: &str, config: &ScanConfig) -> Result<Page> {
        let start: usize = cursor
            .parse()
            .map_err(|_| anyhow!("malformed cursor: {cursor:?}"))?;
        if start > self.entries.len() {
            return Err(anyhow!("cursor {start} past end of keyspace"));
        }

        let step = config.page_work_hint.max(1);
        let end = start.saturating_add(step).min(self.entries.len());
        let window = &self.entries[start..end];

        let mut keys = Vec::new();
        let mut kinds = Vec::new();
        let mut metrics = Vec::new();
        for entry in window {
            if !glob_match(&config.match_pattern, &entry.key) {
                continue;
            }
            keys.push(Value::Text(entry.key.clone()));
            kinds.push(Value::Text(entry.kind.clone()));
            metrics.push(Value::Float(entry.metric));
        }

        let next_cursor = if end >= self.entries.len() {
            TERMINAL_CURSOR.to_string()
        } else {
            end.to_string()
        };

        let data = Frame::new()
            .with_column(Column::new("key", keys))
            .with_column(Column::new("type", kinds))
            .with_column(Column::new("metric", metrics));
        // The work count reports entries examined, not entries matched, so
        // progress tracks keyspace coverage even under a narrow pattern.
        let meta = Frame::new()
            .with_column(Column::new("cursor", vec![Value::Text(next_cursor)]))
            .with_column(Column::new("count", vec![Value::Int(window.len() as i64)]));

        Ok(Page {
            data,
            meta: Some(meta),
        })
    }

    async fn fetch_total(&self) -> Result<u64> {
        Ok(self.entries.len() as u64)
    }
}

/// Minimal glob matcher for the scan pattern: `*` matches any run of
/// characters, `?` matches exactly one, everything else is literal.
///
/// Iterative with single-star rollback, so a run of stars stays linear in
/// the text length instead of backtracking exponentially.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let (pattern, text) = (pattern.as_bytes(), text.as_bytes());
    let (mut p, mut t) = (0, 0);
    // Most recent `*` and the text offset its match currently ends at.
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            // Mismatch past a star: widen that star by one character and
            // retry from there.
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}
