use serde::{Deserialize, Serialize};

/// Distinguished cursor value: accepted by the source to begin a scan, and
/// returned by the source when no more pages remain. An empty or missing
/// cursor is *not* equivalent to this value.
pub const TERMINAL_CURSOR: &str = "0";

/// One observed entry in the remote keyspace at a point in time.
///
/// Immutable once constructed; a newer observation of the same key supersedes
/// the record rather than mutating it. `kind` and `metric` are optional
/// because a page may omit those columns entirely.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub metric: Option<f64>,
}

/// Per-scan configuration, read fresh at each step so operator edits take
/// effect on the next page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Cap on the retained top-K set.
    pub result_bound: usize,
    /// Advisory per-page work hint passed to the source; does not bound the
    /// number of records a page returns.
    pub page_work_hint: usize,
    /// Glob-style key filter, passed through opaquely.
    pub match_pattern: String,
}

impl ScanConfig {
    pub fn apply(&mut self, patch: ScanConfigPatch) {
        if let Some(bound) = patch.result_bound {
            self.result_bound = bound;
        }
        if let Some(hint) = patch.page_work_hint {
            self.page_work_hint = hint;
        }
        if let Some(pattern) = patch.match_pattern {
            self.match_pattern = pattern;
        }
    }
}

/// Partial update to a `ScanConfig`; absent fields keep their current value.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanConfigPatch {
    #[serde(default)]
    pub result_bound: Option<usize>,
    #[serde(default)]
    pub page_work_hint: Option<usize>,
    #[serde(default)]
    pub match_pattern: Option<String>,
}

/// Default-config bundles for the two operational views built on the same
/// controller: a small "keys consuming memory" watchlist and a wider
/// biggest-keys inventory. The controller itself is identical for both.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScanProfile {
    Keys,
    BiggestKeys,
}

impl ScanProfile {
    pub fn defaults(self) -> ScanConfig {
        match self {
            ScanProfile::Keys => ScanConfig {
                result_bound: 10,
                page_work_hint: 100,
                match_pattern: "*".into(),
            },
            ScanProfile::BiggestKeys => ScanConfig {
                result_bound: 100,
                page_work_hint: 500,
                match_pattern: "*".into(),
            },
        }
    }
}

/// Scan-session progress counters. `total` comes from a separate one-shot
/// count query and may be stale relative to a live keyspace; `processed`
/// never exceeds it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: u64,
    pub processed: u64,
}

/// Externally observable state of one scan session. Owned exclusively by the
/// controller; consumers read cloned snapshots.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanSessionState {
    pub cursor: String,
    pub records: Vec<ScanRecord>,
    pub progress: Progress,
    pub running: bool,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    /// Bumped on every `start()`; an in-flight step whose generation no
    /// longer matches must not mutate state.
    #[serde(skip)]
    pub generation: u64,
}

impl ScanSessionState {
    pub fn new() -> Self {
        Self {
            cursor: TERMINAL_CURSOR.to_string(),
            ..Self::default()
        }
    }
}
