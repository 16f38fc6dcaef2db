use super::ResponseCache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Periodically drops cache entries nobody has subscribed to for
/// `keep_unused_for`. Stops when `shutdown` flips to `true` or its sender is
/// dropped.
pub fn spawn_cache_janitor(
    cache: Arc<ResponseCache>,
    keep_unused_for: Duration,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_millis(100));
    tokio::spawn(async move {
        loop {
            tokio::select! {
              changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                  break;
                }
              }
              _ = tokio::time::sleep(interval) => {
                let pruned = cache.prune_unused(keep_unused_for, Instant::now());
                if pruned > 0 {
                  debug!(pruned, remaining = cache.len(), "pruned unused cache entries");
                }
              }
            }
        }
    })
}
