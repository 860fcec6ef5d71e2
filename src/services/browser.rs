use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// Element not found, stale, or otherwise momentarily unusable.
    /// Resolved by re-enumeration, never by retrying the same handle.
    #[error("transient ui failure: {0}")]
    Transient(String),
    /// The WebDriver session is gone; aborts the whole run.
    #[error("browser session lost: {0}")]
    SessionLost(String),
}

impl BrowserError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BrowserError::SessionLost(_))
    }
}

/// The rendering/automation surface the pipeline drives. One session, one
/// caller at a time; all positional operations re-resolve elements by
/// selector so stale handles are never reused.
#[async_trait]
pub trait Browser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Number of result items currently materialized for `selector`.
    async fn item_count(&self, selector: &str) -> Result<usize, BrowserError>;

    /// Whether at least one element matches right now (no waiting).
    async fn exists_now(&self, selector: &str) -> Result<bool, BrowserError>;

    async fn scroll_to_item(&self, selector: &str, index: usize) -> Result<(), BrowserError>;

    async fn open_item(&self, selector: &str, index: usize) -> Result<(), BrowserError>;

    /// Trimmed text of the first match, if any.
    async fn read_text(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    async fn read_attr(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Scrolls the result feed to its bottom to trigger further loading.
    async fn scroll_feed(&self, feed_selector: &str) -> Result<(), BrowserError>;

    /// Opens an isolated tab, navigates it to `url`, collects up to `limit`
    /// hrefs matching `selector`, then closes the tab and restores the
    /// caller's original window, also on error.
    async fn search_links(
        &self,
        url: &str,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<String>, BrowserError>;
}
