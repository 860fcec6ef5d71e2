use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::configuration::Settings;
use crate::dal::{Ledger, SaveOutcome};
use crate::domain::{current_timestamp, Lead, Task, NAME_UNKNOWN, PHONE_UNKNOWN};
use crate::services::browser::{Browser, BrowserError};
use crate::services::classifier::{Classifier, Verdict};
use crate::services::events::EventSender;
use crate::services::pacing::{cooldown_duration, human_pause, interruptible_pause, CancelFlag};
use crate::services::paginator::Paginator;

const MAPS_SEARCH_BASE: &str = "https://www.google.com/maps/search/";

/// How often the result wait re-checks the page and the stop flag.
const RESULT_POLL: Duration = Duration::from_millis(500);

/// Process-wide progress for one run; monotonically non-decreasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub checked: u32,
    pub found: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Querying,
    WaitingForResults,
    Extracting,
    Cooldown,
    Done,
    Aborted,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskPhase::Querying => "querying",
            TaskPhase::WaitingForResults => "waiting for results",
            TaskPhase::Extracting => "extracting",
            TaskPhase::Cooldown => "cooldown",
            TaskPhase::Done => "done",
            TaskPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: u32,
    pub found: u32,
    /// True when the run ended early because the browser session died.
    pub session_lost: bool,
}

/// Drives a run of search tasks end to end: issue the query, wait for
/// results, walk the feed with the paginator, classify every new item, and
/// hand validated leads to the ledger. Exactly one orchestrator drives one
/// browser session; the ledger has no other writer.
pub struct Orchestrator<'a, B: Browser> {
    browser: &'a B,
    ledger: Ledger,
    classifier: Classifier,
    settings: Settings,
    events: EventSender,
    cancel: CancelFlag,
    counters: RunCounters,
}

impl<'a, B: Browser> Orchestrator<'a, B> {
    pub fn new(
        browser: &'a B,
        ledger: Ledger,
        settings: Settings,
        events: EventSender,
        cancel: CancelFlag,
    ) -> Self {
        let classifier = Classifier::new(settings.selectors.clone(), &settings.limits);
        Orchestrator {
            browser,
            ledger,
            classifier,
            settings,
            events,
            cancel,
            counters: RunCounters::default(),
        }
    }

    pub async fn run(mut self, tasks: &[Task]) -> RunSummary {
        let total = tasks.len();
        let mut session_lost = false;

        for (index, task) in tasks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.phase(task, TaskPhase::Aborted);
                break;
            }
            if self.counters.checked >= self.settings.limits.max_leads_to_check {
                self.events.line("Global check cap reached, ending run.");
                break;
            }

            self.events
                .line(format!("--- Search {}/{}: {} ---", index + 1, total, task.query()));

            match self.run_task(task).await {
                Ok(()) => self.phase(task, TaskPhase::Done),
                Err(e) if e.is_fatal() => {
                    log::error!("Browser session lost: {e}");
                    self.events.line(format!("Browser session lost, aborting run: {e}"));
                    session_lost = true;
                    break;
                }
                Err(e) => {
                    self.events.line(format!("Search '{}' failed: {e}", task.query()));
                }
            }

            let last = index + 1 == total;
            if !last && !self.cancel.is_cancelled() {
                self.phase(task, TaskPhase::Cooldown);
                let pause = cooldown_duration(
                    self.settings.limits.cooldown_min_secs,
                    self.settings.limits.cooldown_max_secs,
                );
                self.events
                    .line(format!("Safety break of {}s before the next search...", pause.as_secs()));
                interruptible_pause(&self.cancel, pause).await;
            }
        }

        self.events
            .line(format!(
                "Done. Checked {} businesses, found {} leads.",
                self.counters.checked, self.counters.found
            ));
        self.events.finished(self.counters.checked, self.counters.found);

        RunSummary {
            checked: self.counters.checked,
            found: self.counters.found,
            session_lost,
        }
    }

    async fn run_task(&mut self, task: &Task) -> Result<(), BrowserError> {
        let query = task.query();

        self.phase(task, TaskPhase::Querying);
        self.browser.navigate(&maps_search_url(&query)).await?;

        self.phase(task, TaskPhase::WaitingForResults);
        if !self.wait_for_results().await? {
            if !self.cancel.is_cancelled() {
                // Non-fatal: log and move on to the next search.
                self.events
                    .line(format!("No results loaded for '{}', skipping.", query));
            }
            return Ok(());
        }

        self.phase(task, TaskPhase::Extracting);
        self.extract(task, &query).await
    }

    /// Bounded wait for the first result item. Returns false on timeout or
    /// cancellation; transient lookup trouble counts as "not yet".
    async fn wait_for_results(&self) -> Result<bool, BrowserError> {
        let deadline = Instant::now() + Duration::from_millis(self.settings.limits.result_wait_ms);
        loop {
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
            match self
                .browser
                .exists_now(&self.settings.selectors.result_item)
                .await
            {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => {}
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(RESULT_POLL).await;
        }
    }

    async fn extract(&mut self, task: &Task, query: &str) -> Result<(), BrowserError> {
        let limits = self.settings.limits.clone();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut paginator = Paginator::new(&self.settings.selectors, &limits);

        'feed: loop {
            if self.cancel.is_cancelled() {
                self.phase(task, TaskPhase::Aborted);
                break;
            }
            if self.counters.checked >= limits.max_leads_to_check {
                self.events.line("Reached the per-run check cap.");
                break;
            }

            let batch = match paginator.next_batch(self.browser, &visited).await {
                Ok(batch) => batch,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // Stale feed; re-enumerate after a short pause.
                    log::warn!("Could not enumerate results: {e}");
                    human_pause(limits.item_delay_min_ms, limits.item_delay_max_ms).await;
                    continue;
                }
            };

            if batch.fresh.is_empty() {
                if batch.exhausted {
                    self.events.line("Reached the end of the results.");
                    break;
                }
                continue;
            }

            for index in batch.fresh {
                if self.cancel.is_cancelled() {
                    self.phase(task, TaskPhase::Aborted);
                    break 'feed;
                }
                if self.counters.checked >= limits.max_leads_to_check {
                    self.events.line("Reached the per-run check cap.");
                    break 'feed;
                }

                visited.insert(index);
                self.counters.checked += 1;

                match self.process_item(task, query, index).await {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    // One bad item never ends the run.
                    Err(e) => {
                        self.events
                            .line(format!("Error processing item {index}: {e}"));
                    }
                }

                human_pause(limits.item_delay_min_ms, limits.item_delay_max_ms).await;
            }
        }

        Ok(())
    }

    async fn process_item(
        &mut self,
        task: &Task,
        query: &str,
        index: usize,
    ) -> Result<(), BrowserError> {
        let selectors = &self.settings.selectors;
        let limits = &self.settings.limits;

        // The feed may have shed items since enumeration; skip silently.
        let count = self.browser.item_count(&selectors.result_item).await?;
        if index >= count {
            return Ok(());
        }

        self.browser.scroll_to_item(&selectors.result_item, index).await?;
        human_pause(limits.item_delay_min_ms, limits.item_delay_max_ms).await;
        self.browser.open_item(&selectors.result_item, index).await?;
        human_pause(limits.detail_delay_min_ms, limits.detail_delay_max_ms).await;

        let name = self
            .browser
            .read_text(&selectors.business_name)
            .await?
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| NAME_UNKNOWN.to_string());

        match self
            .classifier
            .classify(self.browser, &name, &task.location)
            .await?
        {
            Verdict::HasWebsite => {
                self.events.line(format!("{name}: has a website, skipping."));
            }
            Verdict::NoWebsiteConfirmed => {
                let phone = self.read_phone().await?;
                let lead = Lead::new(name, phone, query.to_string(), current_timestamp());
                self.save_lead(lead);
            }
        }
        Ok(())
    }

    async fn read_phone(&self) -> Result<String, BrowserError> {
        let selector = &self.settings.selectors.phone_button;
        let raw = match self.browser.read_attr(selector, "aria-label").await? {
            Some(label) => Some(label),
            None => self.browser.read_text(selector).await?,
        };
        Ok(raw
            .map(|p| p.replace("Phone: ", "").trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| PHONE_UNKNOWN.to_string()))
    }

    /// A failed append is logged and the run continues; the lead is simply
    /// not recorded and the in-memory dedup set stays untouched.
    fn save_lead(&mut self, lead: Lead) {
        match self.ledger.save(&lead) {
            Ok(SaveOutcome::Saved) => {
                self.counters.found += 1;
                self.events
                    .line(format!("*** LEAD SAVED: {} | {} ***", lead.name, lead.phone));
            }
            Ok(SaveOutcome::DuplicateSkipped) => {
                self.events
                    .line(format!("{}: already in the ledger, skipping.", lead.name));
            }
            Err(e) => {
                log::error!("Failed to persist lead '{}': {e}", lead.name);
                self.events
                    .line(format!("Could not persist lead '{}': {e}", lead.name));
            }
        }
    }

    fn phase(&self, task: &Task, phase: TaskPhase) {
        log::debug!("{}: {}", task.query(), phase);
        if matches!(phase, TaskPhase::Aborted) {
            self.events.line(format!("Stopped during '{}'.", task.query()));
        }
    }
}

/// Direct navigation to the listing search URL; more robust than driving
/// the search box.
fn maps_search_url(query: &str) -> String {
    let mut url = Url::parse(MAPS_SEARCH_BASE).unwrap();
    url.path_segments_mut().unwrap().pop_if_empty().push(query);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Settings;
    use crate::services::browser::testing::{FakeBrowser, FakeItem};
    use crate::services::events::event_channel;
    use std::fs;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn fast_settings(store: &PathBuf) -> Settings {
        let mut settings = Settings::default();
        settings.limits.result_wait_ms = 50;
        settings.limits.website_wait_ms = 0;
        settings.limits.item_delay_min_ms = 0;
        settings.limits.item_delay_max_ms = 0;
        settings.limits.detail_delay_min_ms = 0;
        settings.limits.detail_delay_max_ms = 0;
        settings.limits.scroll_settle_min_ms = 0;
        settings.limits.scroll_settle_max_ms = 0;
        settings.limits.cooldown_min_secs = 0;
        settings.limits.cooldown_max_secs = 0;
        settings.store.csv_path = store.to_string_lossy().into_owned();
        settings
    }

    fn temp_store() -> PathBuf {
        std::env::temp_dir().join(format!("prospect-run-{}.csv", Uuid::new_v4()))
    }

    fn with_site(name: &str) -> FakeItem {
        FakeItem {
            name: name.to_string(),
            phone: Some("+595 21 000".to_string()),
            has_website_indicator: true,
            search_hits: vec![],
        }
    }

    fn candidate(name: &str, phone: Option<&str>, hits: Vec<&str>) -> FakeItem {
        FakeItem {
            name: name.to_string(),
            phone: phone.map(String::from),
            has_website_indicator: false,
            search_hits: hits.into_iter().map(String::from).collect(),
        }
    }

    async fn run(
        browser: &FakeBrowser,
        settings: Settings,
        cancel: CancelFlag,
        tasks: &[Task],
    ) -> RunSummary {
        let ledger = Ledger::load(&settings.store.csv_path).unwrap();
        let (events, receiver) = event_channel();
        drop(receiver);
        Orchestrator::new(browser, ledger, settings, events, cancel)
            .run(tasks)
            .await
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let store = temp_store();
        let settings = fast_settings(&store);
        // 5 items: 3 with a website, one true lead, one refuted by the
        // secondary search.
        let browser = FakeBrowser::new(
            settings.selectors.clone(),
            vec![
                with_site("Dental Uno"),
                with_site("Dental Dos"),
                candidate(
                    "Clinica Zanon",
                    Some("+595 21 555"),
                    vec![
                        "https://www.facebook.com/zanon",
                        "https://maps.google.com/zanon",
                    ],
                ),
                with_site("Dental Tres"),
                candidate(
                    "Consultorio Gill",
                    None,
                    vec!["https://consultoriogill.com.py"],
                ),
            ],
        );

        let summary = run(
            &browser,
            settings,
            CancelFlag::new(),
            &[Task::new("Dentists", "Centro")],
        )
        .await;

        assert_eq!(summary.checked, 5);
        assert_eq!(summary.found, 1);
        assert!(!summary.session_lost);

        let contents = fs::read_to_string(&store).unwrap();
        let rows: Vec<&str> = contents.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].contains("Clinica Zanon"));
        assert!(rows[1].contains("+595 21 555"));
        assert!(rows[1].contains("Dentists in Centro"));
        fs::remove_file(&store).unwrap();
    }

    #[tokio::test]
    async fn checked_never_exceeds_global_cap() {
        let store = temp_store();
        let mut settings = fast_settings(&store);
        settings.limits.max_leads_to_check = 3;

        let items: Vec<FakeItem> = (0..10).map(|i| with_site(&format!("Biz {i}"))).collect();
        let browser = FakeBrowser::new(settings.selectors.clone(), items);

        // Two tasks; the cap must hold across the whole run.
        let tasks = [Task::new("Dentists", "Centro"), Task::new("Dentists", "Recoleta")];
        let summary = run(&browser, settings, CancelFlag::new(), &tasks).await;

        assert_eq!(summary.checked, 3);
        assert_eq!(summary.found, 0);
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn cancellation_lets_in_flight_item_finish() {
        let store = temp_store();
        let settings = fast_settings(&store);
        let cancel = CancelFlag::new();

        let items: Vec<FakeItem> = (0..5)
            .map(|i| candidate(&format!("Lead {i}"), None, vec![]))
            .collect();
        let browser = FakeBrowser::new(settings.selectors.clone(), items);
        // Stop request lands while item 0 is being opened.
        *browser.cancel_on_open.lock().unwrap() = Some(cancel.clone());

        let summary = run(&browser, settings, cancel, &[Task::new("Dentists", "Centro")]).await;

        // The in-flight item completed (and saved); no new item started.
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.found, 1);
        fs::remove_file(&store).unwrap();
    }

    #[tokio::test]
    async fn pre_cancelled_run_checks_nothing() {
        let store = temp_store();
        let settings = fast_settings(&store);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let browser = FakeBrowser::new(settings.selectors.clone(), vec![with_site("Biz")]);
        let summary = run(&browser, settings, cancel, &[Task::new("Dentists", "Centro")]).await;

        assert_eq!(summary.checked, 0);
        assert!(browser.navigations.lock().unwrap().is_empty());
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn empty_results_skip_task_without_failing() {
        let store = temp_store();
        let settings = fast_settings(&store);
        let browser = FakeBrowser::new(settings.selectors.clone(), vec![]);

        let summary = run(
            &browser,
            settings,
            CancelFlag::new(),
            &[Task::new("Dentists", "Nowhere")],
        )
        .await;

        assert_eq!(summary.checked, 0);
        assert_eq!(summary.found, 0);
        assert!(!summary.session_lost);
    }

    #[tokio::test]
    async fn duplicate_across_tasks_is_skipped() {
        let store = temp_store();
        let settings = fast_settings(&store);
        let browser = FakeBrowser::new(
            settings.selectors.clone(),
            vec![candidate("Clinica Zanon", Some("+595 21 555"), vec![])],
        );

        // Same listing surfaces in both searches; one row persists.
        let tasks = [Task::new("Dentists", "Centro"), Task::new("Dentists", "Recoleta")];
        let summary = run(&browser, settings, CancelFlag::new(), &tasks).await;

        assert_eq!(summary.checked, 2);
        assert_eq!(summary.found, 1);
        let contents = fs::read_to_string(&store).unwrap();
        assert_eq!(contents.lines().count(), 2);
        fs::remove_file(&store).unwrap();
    }

    #[test]
    fn maps_url_is_percent_encoded() {
        let url = maps_search_url("Dentists in Centro, Asuncion");
        assert_eq!(
            url,
            "https://www.google.com/maps/search/Dentists%20in%20Centro,%20Asuncion"
        );
    }
}
