use tracing::trace;

// Counters are trace events under `sync.metrics`; a subscriber aggregates them.

pub fn outcome(phase: &'static str, status: &'static str) {
    trace!(target = "sync.metrics", phase, status, "record_outcome_inc");
}

pub fn rate_limited(op: &'static str, attempt: u32) {
    trace!(target = "sync.metrics", op, attempt, "rate_limited_inc");
}

pub fn retries_exhausted(op: &'static str) {
    trace!(target = "sync.metrics", op, "retries_exhausted_inc");
}

pub fn stage_elapsed(stage: &'static str, elapsed_ms: u128) {
    let elapsed_ms = u64::try_from(elapsed_ms).unwrap_or(u64::MAX);
    trace!(target = "sync.metrics", stage, elapsed_ms, "stage_elapsed");
}
