use std::collections::HashSet;

use crate::configuration::{LimitSettings, SelectorSettings};
use crate::services::browser::{Browser, BrowserError};
use crate::services::pacing::human_pause;

/// One slice of new work from the result feed.
#[derive(Debug, PartialEq, Eq)]
pub struct Batch {
    /// Positions not yet visited, in left-to-right order.
    pub fresh: Vec<usize>,
    pub exhausted: bool,
}

/// Enumerates the incrementally-growing result list by position.
///
/// Positions are not stable identities; they only hold up because a session
/// processes strictly left-to-right and never revisits. When every
/// materialized position has been visited the paginator scrolls the feed to
/// load more, and reports exhaustion after two consecutive loads with no
/// growth.
pub struct Paginator {
    item_selector: String,
    feed_selector: String,
    scroll_settle_ms: (u64, u64),
    /// Consecutive scroll attempts that failed to grow the list.
    no_growth_streak: u8,
}

const NO_GROWTH_LIMIT: u8 = 2;

impl Paginator {
    pub fn new(selectors: &SelectorSettings, limits: &LimitSettings) -> Self {
        Paginator {
            item_selector: selectors.result_item.clone(),
            feed_selector: selectors.result_feed.clone(),
            scroll_settle_ms: (limits.scroll_settle_min_ms, limits.scroll_settle_max_ms),
            no_growth_streak: 0,
        }
    }

    pub async fn next_batch<B: Browser>(
        &mut self,
        browser: &B,
        visited: &HashSet<usize>,
    ) -> Result<Batch, BrowserError> {
        let count = browser.item_count(&self.item_selector).await?;
        let fresh = unvisited(count, visited);

        if !fresh.is_empty() {
            self.no_growth_streak = 0;
            return Ok(Batch {
                fresh,
                exhausted: false,
            });
        }

        // Everything materialized has been seen; ask the feed for more.
        browser.scroll_feed(&self.feed_selector).await?;
        human_pause(self.scroll_settle_ms.0, self.scroll_settle_ms.1).await;

        let new_count = browser.item_count(&self.item_selector).await?;
        if new_count > count {
            self.no_growth_streak = 0;
        } else {
            self.no_growth_streak += 1;
        }

        Ok(Batch {
            fresh: unvisited(new_count, visited),
            exhausted: self.no_growth_streak >= NO_GROWTH_LIMIT,
        })
    }
}

/// Positions below `count` not yet in `visited`. Visited indices beyond the
/// current length (the list shrank) are dropped silently.
fn unvisited(count: usize, visited: &HashSet<usize>) -> Vec<usize> {
    (0..count).filter(|i| !visited.contains(i)).collect()
}
