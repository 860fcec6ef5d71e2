use async_trait::async_trait;
use rand::Rng;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;

use crate::configuration::WebdriverSettings;
use crate::services::browser::{Browser, BrowserError};
use crate::services::pacing::human_pause;

/// Production [`Browser`] over a thirtyfour WebDriver session.
pub struct Droid {
    pub driver: WebDriver,
}

impl Droid {
    pub async fn new(settings: &WebdriverSettings) -> Result<Self, BrowserError> {
        let mut caps = DesiredCapabilities::chrome();

        // Slightly randomized window size, to look less like a bot fleet.
        let (width, height) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(1000..=1400), rng.gen_range(800..=1000))
        };
        caps.add_arg(&format!("--window-size={},{}", width, height))
            .map_err(map_webdriver_err)?;

        let driver = WebDriver::new(&settings.server_url, caps)
            .await
            .map_err(map_webdriver_err)?;

        Ok(Droid { driver })
    }

    pub async fn quit(self) {
        if let Err(e) = self.driver.quit().await {
            log::warn!("Failed to shut down browser session cleanly: {e}");
        }
    }

    async fn collect_links(
        &self,
        url: &str,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<String>, BrowserError> {
        self.driver.goto(url).await.map_err(map_webdriver_err)?;
        human_pause(2_000, 4_000).await;

        let anchors = self
            .driver
            .find_all(By::Css(selector))
            .await
            .map_err(map_webdriver_err)?;

        let mut links = Vec::new();
        for anchor in anchors {
            if links.len() >= limit {
                break;
            }
            match anchor.attr("href").await {
                Ok(Some(href)) if !href.is_empty() => links.push(href),
                Ok(_) => {}
                // A single stale anchor is not worth failing the scan over.
                Err(e) => log::debug!("Skipping unreadable search link: {e}"),
            }
        }
        Ok(links)
    }
}

#[async_trait]
impl Browser for Droid {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.driver.goto(url).await.map_err(map_webdriver_err)
    }

    async fn item_count(&self, selector: &str) -> Result<usize, BrowserError> {
        let items = self
            .driver
            .find_all(By::Css(selector))
            .await
            .map_err(map_webdriver_err)?;
        Ok(items.len())
    }

    async fn exists_now(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.item_count(selector).await? > 0)
    }

    async fn scroll_to_item(&self, selector: &str, index: usize) -> Result<(), BrowserError> {
        let items = self
            .driver
            .find_all(By::Css(selector))
            .await
            .map_err(map_webdriver_err)?;
        let item = items
            .get(index)
            .ok_or_else(|| BrowserError::Transient(format!("no item at index {index}")))?;
        item.scroll_into_view().await.map_err(map_webdriver_err)
    }

    async fn open_item(&self, selector: &str, index: usize) -> Result<(), BrowserError> {
        // Re-resolve by index on every call; DOM refreshes detach handles.
        let items = self
            .driver
            .find_all(By::Css(selector))
            .await
            .map_err(map_webdriver_err)?;
        let item = items
            .get(index)
            .ok_or_else(|| BrowserError::Transient(format!("no item at index {index}")))?;
        item.click().await.map_err(map_webdriver_err)
    }

    async fn read_text(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        match self.driver.find(By::Css(selector)).await {
            Ok(element) => {
                let text = element.text().await.map_err(map_webdriver_err)?;
                Ok(Some(text.trim().to_string()))
            }
            Err(e) => absent_as_none(e),
        }
    }

    async fn read_attr(
        &self,
        selector: &str,
        attr: &str,
    ) -> Result<Option<String>, BrowserError> {
        match self.driver.find(By::Css(selector)).await {
            Ok(element) => element.attr(attr).await.map_err(map_webdriver_err),
            Err(e) => absent_as_none(e),
        }
    }

    async fn scroll_feed(&self, feed_selector: &str) -> Result<(), BrowserError> {
        let script = format!(
            "const feed = document.querySelector('{}'); if (feed) {{ feed.scrollTop = feed.scrollHeight; }}",
            feed_selector
        );
        self.driver
            .execute(&script, vec![])
            .await
            .map_err(map_webdriver_err)?;
        Ok(())
    }

    async fn search_links(
        &self,
        url: &str,
        selector: &str,
        limit: usize,
    ) -> Result<Vec<String>, BrowserError> {
        let original = self.driver.window().await.map_err(map_webdriver_err)?;

        let tab = self.driver.new_tab().await.map_err(map_webdriver_err)?;
        self.driver
            .switch_to_window(tab)
            .await
            .map_err(map_webdriver_err)?;

        let result = self.collect_links(url, selector, limit).await;

        // Always tear the tab down and restore the caller's window, even
        // when the scan itself failed.
        if let Ok(current) = self.driver.window().await {
            if current != original {
                if let Err(e) = self.driver.close_window().await {
                    log::warn!("Failed to close verification tab: {e}");
                }
            }
        }
        self.driver
            .switch_to_window(original)
            .await
            .map_err(map_webdriver_err)?;

        result
    }
}

fn absent_as_none<T>(e: WebDriverError) -> Result<Option<T>, BrowserError> {
    match map_webdriver_err(e) {
        BrowserError::Transient(_) => Ok(None),
        fatal => Err(fatal),
    }
}

fn map_webdriver_err(e: WebDriverError) -> BrowserError {
    let transient = matches!(
        e,
        WebDriverError::NoSuchElement(_)
            | WebDriverError::StaleElementReference(_)
            | WebDriverError::ElementNotInteractable(_)
            | WebDriverError::ElementClickIntercepted(_)
    );
    if transient {
        BrowserError::Transient(e.to_string())
    } else {
        BrowserError::SessionLost(e.to_string())
    }
}
