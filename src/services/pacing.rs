use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

/// Cooperative stop request, polled by the worker at every suspension
/// point: waits, sleeps, between items and between tasks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Granularity of interruptible sleeps; bounds cancellation latency.
const CANCEL_POLL_SLICE: Duration = Duration::from_millis(250);

/// Random pause within the given bounds, to mimic human interaction.
pub async fn human_pause(min_ms: u64, max_ms: u64) {
    let ms = {
        let mut rng = rand::thread_rng();
        rng.gen_range(min_ms..=max_ms.max(min_ms))
    };
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Sleeps for `total`, waking every 250 ms to check for cancellation.
/// Returns false if the sleep was cut short by a stop request.
pub async fn interruptible_pause(cancel: &CancelFlag, total: Duration) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        let slice = remaining.min(CANCEL_POLL_SLICE);
        tokio::time::sleep(slice).await;
        remaining = remaining.saturating_sub(slice);
    }
    !cancel.is_cancelled()
}

/// Random inter-task cooldown duration within the configured bounds.
pub fn cooldown_duration(min_secs: u64, max_secs: u64) -> Duration {
    let secs = {
        let mut rng = rand::thread_rng();
        rng.gen_range(min_secs..=max_secs.max(min_secs))
    };
    Duration::from_secs(secs)
}
