use crate::types::Progress;

/// Advance `processed` by one page's reported work count, clamped so it
/// never exceeds `total` (the total is best-effort and may undercount a
/// mutating keyspace).
pub fn advance(progress: Progress, work_done: u64) -> Progress {
    Progress {
        total: progress.total,
        processed: progress.total.min(progress.processed.saturating_add(work_done)),
    }
}

/// Overwrite `total` without touching `processed`.
pub fn set_total(progress: Progress, total: u64) -> Progress {
    Progress {
        total,
        processed: progress.processed,
    }
}
