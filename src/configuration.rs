use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub webdriver: WebdriverSettings,
    pub selectors: SelectorSettings,
    pub limits: LimitSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebdriverSettings {
    pub server_url: String,
}

/// CSS selectors for the listing UI. Update these if the page structure
/// changes; verify with the browser inspector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSettings {
    /// One row in the paginated result feed.
    pub result_item: String,
    /// The website link in the opened detail panel.
    pub website_button: String,
    /// Business name heading in the detail panel.
    pub business_name: String,
    /// Phone button in the detail panel, number lives in its aria-label.
    pub phone_button: String,
    /// Scrollable container holding the result feed.
    pub result_feed: String,
    /// Organic result links on the verification search page.
    pub search_result_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitSettings {
    pub max_leads_to_check: u32,
    /// Bounded wait for the first result after navigating a query.
    pub result_wait_ms: u64,
    /// Bounded poll for the website indicator in the detail panel.
    pub website_wait_ms: u64,
    /// Human-like pause between item interactions.
    pub item_delay_min_ms: u64,
    pub item_delay_max_ms: u64,
    /// Pause after opening a detail panel, before reading it.
    pub detail_delay_min_ms: u64,
    pub detail_delay_max_ms: u64,
    /// Pause after scrolling the feed, giving the next page time to load.
    pub scroll_settle_min_ms: u64,
    pub scroll_settle_max_ms: u64,
    /// Anti-detection cooldown between tasks.
    pub cooldown_min_secs: u64,
    pub cooldown_max_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    pub csv_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            webdriver: WebdriverSettings {
                server_url: "http://localhost:9515".to_string(),
            },
            selectors: SelectorSettings {
                result_item: r#"div[role="article"]"#.to_string(),
                website_button: r#"a[data-item-id="authority"]"#.to_string(),
                business_name: "h1.DUwDvf".to_string(),
                phone_button: r#"button[data-item-id^="phone"]"#.to_string(),
                result_feed: r#"div[role="feed"]"#.to_string(),
                search_result_link: "div.g a".to_string(),
            },
            limits: LimitSettings {
                max_leads_to_check: 50,
                result_wait_ms: 30_000,
                website_wait_ms: 3_000,
                item_delay_min_ms: 1_000,
                item_delay_max_ms: 3_000,
                detail_delay_min_ms: 2_000,
                detail_delay_max_ms: 4_000,
                scroll_settle_min_ms: 2_000,
                scroll_settle_max_ms: 4_000,
                cooldown_min_secs: 15,
                cooldown_max_secs: 25,
            },
            store: StoreSettings {
                csv_path: "leads.csv".to_string(),
            },
        }
    }
}

/// Built-in defaults, overridden by an optional `configuration.yaml` in the
/// working directory.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Config::try_from(&Settings::default())?)
        .add_source(config::File::with_name("configuration").required(false))
        .build()?;

    settings.try_deserialize::<Settings>()
}
