//! Bounded polling for asynchronous page state

use std::time::Duration;
use tokio::time::sleep;

use crate::dom::Document;

/// Poll `predicate` at most `attempts + 1` times
///
/// Between checks the page gets one task turn (animations, re-renders) and
/// the caller's interval elapses. Returns the attempt at which the predicate
/// held, or `None` once the budget is spent.
pub async fn poll_until<F>(
    doc: &mut Document,
    attempts: u32,
    interval: Duration,
    mut predicate: F,
) -> Option<u32>
where
    F: FnMut(&Document) -> bool,
{
    for attempt in 0..attempts {
        if predicate(doc) {
            return Some(attempt);
        }
        doc.run_pending_tasks();
        if !interval.is_zero() {
            sleep(interval).await;
        }
    }
    predicate(doc).then_some(attempts)
}
