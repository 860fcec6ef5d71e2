use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::configuration::{LimitSettings, SelectorSettings};
use crate::services::browser::{Browser, BrowserError};

const SEARCH_URL: &str = "https://www.google.com/search";

/// Organic results inspected during secondary verification.
const SEARCH_RESULT_LIMIT: usize = 3;

const INDICATOR_POLL: Duration = Duration::from_millis(250);

/// Directory, social and map domains that never count as evidence of an
/// independent business website.
const IGNORED_DOMAINS: [&str; 12] = [
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "yelp.com",
    "tripadvisor.com",
    "yellowpages.com",
    "mapquest.com",
    "tiktok.com",
    "twitter.com",
    "google.com",
    "waze.com",
    "foursquare.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    HasWebsite,
    NoWebsiteConfirmed,
}

/// Two-stage website-presence check over an opened detail panel.
///
/// The listing's own website indicator alone under-reports: plenty of
/// businesses have a site that simply is not linked from the listing. On a
/// negative primary signal the classifier runs an independent web search
/// and treats any non-directory hit in the top results as a website. Any
/// failure of that secondary scan also counts as a website, so verification
/// trouble can only under-report leads, never fabricate them.
pub struct Classifier {
    selectors: SelectorSettings,
    website_wait: Duration,
}

impl Classifier {
    pub fn new(selectors: SelectorSettings, limits: &LimitSettings) -> Self {
        Classifier {
            selectors,
            website_wait: Duration::from_millis(limits.website_wait_ms),
        }
    }

    pub async fn classify<B: Browser>(
        &self,
        browser: &B,
        name: &str,
        location: &str,
    ) -> Result<Verdict, BrowserError> {
        if self.website_indicator_present(browser).await? {
            return Ok(Verdict::HasWebsite);
        }

        log::info!("{name}: no website on the listing, double-checking via web search");
        self.verify_via_search(browser, name, location).await
    }

    /// Primary signal: bounded poll for the website link in the detail
    /// panel, which renders a moment after the panel opens.
    async fn website_indicator_present<B: Browser>(
        &self,
        browser: &B,
    ) -> Result<bool, BrowserError> {
        let deadline = Instant::now() + self.website_wait;
        loop {
            match browser.exists_now(&self.selectors.website_button).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                // Transient read trouble counts as "not there yet".
                Err(_) => {}
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(INDICATOR_POLL).await;
        }
    }

    async fn verify_via_search<B: Browser>(
        &self,
        browser: &B,
        name: &str,
        location: &str,
    ) -> Result<Verdict, BrowserError> {
        let query = format!("{name} {location}");
        let url = Url::parse_with_params(SEARCH_URL, &[("q", query.as_str())]).unwrap();

        let links = match browser
            .search_links(url.as_str(), &self.selectors.search_result_link, SEARCH_RESULT_LIMIT)
            .await
        {
            Ok(links) => links,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                // Fail-safe policy: when verification cannot complete,
                // assume the website exists and drop the candidate.
                log::warn!("Secondary check failed for {name}, assuming it has a website: {e}");
                return Ok(Verdict::HasWebsite);
            }
        };

        for href in links.iter().take(SEARCH_RESULT_LIMIT) {
            if !is_ignored_domain(href) {
                log::info!("{name}: found likely website {href}");
                return Ok(Verdict::HasWebsite);
            }
        }
        Ok(Verdict::NoWebsiteConfirmed)
    }
}

/// True when the link's host belongs to a directory/social domain, or the
/// link cannot be parsed at all (no evidence either way).
fn is_ignored_domain(href: &str) -> bool {
    let Some(host) = Url::parse(href).ok().and_then(|u| u.host_str().map(str::to_lowercase))
    else {
        return true;
    };
    IGNORED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}
