use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use ::time::{format_description::well_known, OffsetDateTime};

use crate::frame::Frame;
use crate::merge;
use crate::page;
use crate::progress;
use crate::query::QuerySource;
use crate::table;
use crate::types::{
    Progress, ScanConfig, ScanConfigPatch, ScanProfile, ScanSessionState, TERMINAL_CURSOR,
};

/// Poll interval used when the operator has not configured one.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Drives one incremental top-K scan over a remote keyspace: issues
/// cursor-paginated page fetches, folds each page into the bounded record
/// set, tracks progress, and schedules the next step until the cursor
/// returns to the terminal value or the operator stops it.
///
/// Steps are strictly sequential: the session task performs one fetch,
/// processes it fully, then sleeps out the interval before the next fetch,
/// so there is never more than one in-flight request per session. `start`
/// while scanning cancels the old session before launching the new one, and
/// a generation counter keeps a cancelled session's late response from
/// touching the new session's state.
pub struct ScanController<Q: QuerySource> {
    source: Arc<Q>,
    config: RwLock<ScanConfig>,
    state: RwLock<ScanSessionState>,
    interval_ms: AtomicU64,
    /// One live session token at a time; replaced or cleared on every
    /// transition.
    session: Mutex<Option<(u64, CancellationToken)>>,
}

impl<Q: QuerySource> ScanController<Q> {
    pub fn new(source: Arc<Q>, config: ScanConfig) -> Arc<Self> {
        Arc::new(Self {
            source,
            config: RwLock::new(config),
            state: RwLock::new(ScanSessionState::new()),
            interval_ms: AtomicU64::new(DEFAULT_INTERVAL_MS),
            session: Mutex::new(None),
        })
    }

    /// Begin a new scan session, cancelling any session already live.
    ///
    /// Records, cursor, and `processed` are reset (the best-effort `total`
    /// is preserved), and the first page is fetched immediately rather than
    /// after a full interval. Calling this while a scan is running is a
    /// clean restart, never an error.
    pub async fn start(self: &Arc<Self>) {
        let token = CancellationToken::new();
        // Lock order is session then state, same as `stop`.
        let mut session = self.session.lock().await;
        if let Some((_, previous)) = session.take() {
            previous.cancel();
        }
        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.records.clear();
            state.cursor = TERMINAL_CURSOR.to_string();
            state.progress.processed = 0;
            state.running = true;
            state.started_at = Some(now_rfc3339());
            state.finished_at = None;
            state.generation
        };
        *session = Some((generation, token.clone()));
        drop(session);

        tracing::info!(generation, "scan session started");
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.run_session(generation, token).await });
    }

    /// Cancel the live session, if any. Valid in every state and idempotent.
    pub async fn stop(&self) {
        if let Some((generation, token)) = self.session.lock().await.take() {
            token.cancel();
            tracing::info!(generation, "scan session stopped");
        }
        let mut state = self.state.write().await;
        if state.running {
            state.running = false;
            state.finished_at = Some(now_rfc3339());
        }
    }

    /// Apply a partial config update. Takes effect on the next step; a page
    /// request already in flight is not retried with the new values.
    pub async fn set_config(&self, patch: ScanConfigPatch) -> ScanConfig {
        let mut config = self.config.write().await;
        config.apply(patch);
        config.clone()
    }

    pub async fn config(&self) -> ScanConfig {
        self.config.read().await.clone()
    }

    /// Change the poll interval. This cancels a live scan instead of
    /// re-deriving the running timer in place; the operator restarts
    /// explicitly with the new cadence.
    pub async fn set_interval_ms(&self, interval_ms: u64) {
        self.stop().await;
        self.interval_ms.store(interval_ms, Ordering::Relaxed);
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    /// The upstream query target changed: stop the scan and re-derive config
    /// defaults from the profile. Does not auto-restart; the operator must
    /// start again.
    pub async fn change_source_defaults(&self, profile: ScanProfile) -> ScanConfig {
        self.stop().await;
        let mut config = self.config.write().await;
        *config = profile.defaults();
        config.clone()
    }

    /// One-shot refresh of the keyspace total, independent of the scan loop.
    /// Failure is swallowed; the previous total (default 0) stays in place.
    pub async fn update_total_keys(&self) {
        match self.source.fetch_total().await {
            Ok(total) => {
                let mut state = self.state.write().await;
                state.progress = progress::set_total(state.progress, total);
            }
            Err(e) => {
                tracing::debug!(error = %e, "total fetch failed; keeping previous total");
            }
        }
    }

    /// Cloned view of the session state for display.
    pub async fn snapshot(&self) -> ScanSessionState {
        self.state.read().await.clone()
    }

    pub async fn progress(&self) -> Progress {
        self.state.read().await.progress
    }

    /// Display projection of the current record set.
    pub async fn table(&self) -> Frame {
        table::to_table(&self.state.read().await.records)
    }

    async fn run_session(self: Arc<Self>, generation: u64, token: CancellationToken) {
        loop {
            let Some((cursor, config)) = self.step_inputs(generation).await else {
                return;
            };

            let fetched = tokio::select! {
                _ = token.cancelled() => return,
                result = self.source.fetch_page(&cursor, &config) => result,
            };

            match fetched {
                Ok(fetched) => {
                    // The fetch may have raced a stop/restart; re-check
                    // before touching state so a stale response is dropped.
                    if token.is_cancelled() {
                        return;
                    }
                    let parsed = page::parse_page(&fetched);
                    let completed = {
                        let mut state = self.state.write().await;
                        if state.generation != generation || !state.running {
                            return;
                        }
                        state.records =
                            merge::merge_top_k(&state.records, &parsed.records, config.result_bound);
                        state.progress = progress::advance(state.progress, parsed.work_done);
                        state.cursor = parsed.next_cursor;
                        tracing::debug!(
                            generation,
                            cursor = %state.cursor,
                            records = state.records.len(),
                            processed = state.progress.processed,
                            "scan step applied"
                        );
                        if state.cursor == TERMINAL_CURSOR {
                            state.running = false;
                            state.finished_at = Some(now_rfc3339());
                            true
                        } else {
                            false
                        }
                    };
                    if completed {
                        self.clear_session(generation).await;
                        tracing::info!(generation, "scan session completed");
                        return;
                    }
                }
                Err(e) => {
                    // Transport failure: the step is a no-op and the next
                    // scheduled step retries from the same cursor.
                    tracing::debug!(generation, error = %e, "page fetch failed; step skipped");
                }
            }

            let interval = Duration::from_millis(self.interval_ms.load(Ordering::Relaxed));
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Snapshot the cursor and config for one step, or `None` when this
    /// session is no longer the live one.
    async fn step_inputs(&self, generation: u64) -> Option<(String, ScanConfig)> {
        let state = self.state.read().await;
        if !state.running || state.generation != generation {
            return None;
        }
        let cursor = state.cursor.clone();
        drop(state);
        Some((cursor, self.config.read().await.clone()))
    }

    async fn clear_session(&self, generation: u64) {
        let mut session = self.session.lock().await;
        if session.as_ref().is_some_and(|(g, _)| *g == generation) {
            *session = None;
        }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
