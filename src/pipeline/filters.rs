//! Bring a page's toggle filters into the requested state.
//!
//! Each filter runs through a small state machine:
//! `Unknown → Checking → AlreadySelected | Selecting(n) → Selected | Failed`.
//! Filters are only ever switched on, so re-applying a set that is already
//! in place clicks nothing.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::browser::{ClickMode, Element, Locator, Page};
use crate::error::BrowserError;

/// A site-defined toggle, addressed by `{category}-{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterSpec {
    pub category: String,
    pub token: String,
}

impl FilterSpec {
    pub fn new(category: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            token: token.into(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}-{}", self.category, self.token)
    }

    /// CSS selector for the toggle control.
    pub fn selector(&self) -> String {
        format!("[id='{}']", self.id())
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Unknown,
    Checking,
    AlreadySelected,
    Selecting { attempt: u32 },
    Selected,
    Failed,
}

impl FilterState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FilterState::AlreadySelected | FilterState::Selected | FilterState::Failed
        )
    }
}

/// Attempt count and timing for toggling one filter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// How long to wait for the control to exist before reading its state.
    pub presence_timeout: Duration,
    /// How long to wait for a click to show up as selected.
    pub verify_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause between failed attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            presence_timeout: Duration::from_secs(2),
            verify_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// First attempt clicks normally, later ones force the click.
    pub fn click_mode(attempt: u32) -> ClickMode {
        if attempt <= 1 {
            ClickMode::Normal
        } else {
            ClickMode::Forced
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub spec: FilterSpec,
    pub state: FilterState,
    pub clicks: Vec<ClickMode>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub already_selected: usize,
    pub selected: usize,
    pub failed: usize,
}

impl FilterSummary {
    pub fn of(outcomes: &[FilterOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o.state {
                FilterState::AlreadySelected => acc.already_selected += 1,
                FilterState::Selected => acc.selected += 1,
                _ => acc.failed += 1,
            }
            acc
        })
    }
}

pub struct FilterSynchronizer<'a> {
    page: &'a dyn Page,
    policy: RetryPolicy,
    selected_class: &'static str,
}

impl<'a> FilterSynchronizer<'a> {
    pub fn new(page: &'a dyn Page, policy: RetryPolicy) -> Self {
        Self {
            page,
            policy,
            selected_class: "selected",
        }
    }

    /// Type the search term into the search box and submit it.
    pub async fn submit_search(&self, search_box: Locator<'_>, term: &str, settle: Duration) {
        let boxes = match self.page.locate(search_box).await {
            Ok(boxes) => boxes,
            Err(e) => {
                tracing::warn!("Could not look up search box: {e}");
                return;
            }
        };
        let Some(input) = boxes.first() else {
            tracing::warn!("Search box {} not found, skipping search term", search_box.as_str());
            return;
        };
        if let Err(e) = input.type_and_submit(term).await {
            tracing::warn!("Failed to submit search term '{term}': {e}");
            return;
        }
        if let Err(e) = self.page.wait_for_network_idle(settle).await {
            tracing::debug!("Search did not settle, continuing: {e}");
        }
    }

    /// Switch on every filter in `specs`, then wait for the page to settle.
    /// Failures are logged and reported in the outcomes, never returned.
    pub async fn apply(&self, specs: &[FilterSpec], settle: Duration) -> Vec<FilterOutcome> {
        let mut seen = HashSet::new();
        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            if seen.insert(spec) {
                outcomes.push(self.sync_one(spec).await);
            }
        }

        if !outcomes.is_empty()
            && let Err(e) = self.page.wait_for_network_idle(settle).await
        {
            tracing::debug!("Filters did not settle, continuing: {e}");
        }
        outcomes
    }

    async fn sync_one(&self, spec: &FilterSpec) -> FilterOutcome {
        let selector = spec.selector();
        let locator = Locator::Css(&selector);
        let mut clicks = Vec::new();
        let mut state = FilterState::Unknown;

        while !state.is_terminal() {
            state = match state {
                FilterState::Unknown => FilterState::Checking,
                FilterState::Checking => match self.current_state(locator).await {
                    Ok(true) => {
                        tracing::debug!("Filter {spec} already selected, skipping");
                        FilterState::AlreadySelected
                    }
                    Ok(false) => FilterState::Selecting { attempt: 1 },
                    Err(e) => {
                        tracing::warn!("Could not check state for {spec}: {e}");
                        FilterState::Selecting { attempt: 1 }
                    }
                },
                FilterState::Selecting { attempt } => {
                    self.attempt(spec, locator, attempt, &mut clicks).await
                }
                terminal => terminal,
            };
        }

        FilterOutcome {
            spec: spec.clone(),
            state,
            clicks,
        }
    }

    async fn attempt(
        &self,
        spec: &FilterSpec,
        locator: Locator<'_>,
        attempt: u32,
        clicks: &mut Vec<ClickMode>,
    ) -> FilterState {
        // A click whose verification timed out may still have landed;
        // clicking again would switch the filter back off.
        if attempt > 1 && self.reads_selected(locator).await {
            tracing::debug!("Filter {spec} turned on after attempt {}", attempt - 1);
            return FilterState::Selected;
        }

        let mode = RetryPolicy::click_mode(attempt);
        match self.try_select(locator, mode, clicks).await {
            Ok(()) => {
                tracing::debug!("Selected filter {spec} on attempt {attempt}");
                FilterState::Selected
            }
            Err(e) if attempt >= self.policy.max_attempts => {
                tracing::warn!("Failed to select filter {spec} after {attempt} attempts: {e}");
                FilterState::Failed
            }
            Err(e) => {
                tracing::debug!("Attempt {attempt} for {spec} failed: {e}");
                tokio::time::sleep(self.policy.backoff).await;
                FilterState::Selecting {
                    attempt: attempt + 1,
                }
            }
        }
    }

    async fn control(&self, locator: Locator<'_>) -> Result<Box<dyn Element>, BrowserError> {
        self.page
            .locate(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::Command(format!("no element matches {}", locator.as_str())))
    }

    async fn current_state(&self, locator: Locator<'_>) -> Result<bool, BrowserError> {
        self.page
            .wait_for(locator, self.policy.presence_timeout)
            .await?;
        let control = self.control(locator).await?;
        self.is_selected(&*control).await
    }

    async fn is_selected(&self, control: &dyn Element) -> Result<bool, BrowserError> {
        let class = control.attr("class").await?.unwrap_or_default();
        Ok(class.split_whitespace().any(|c| c == self.selected_class))
    }

    /// Whether the control currently shows as selected. Lookup and read
    /// failures count as not selected.
    async fn reads_selected(&self, locator: Locator<'_>) -> bool {
        match self.control(locator).await {
            Ok(control) => self.is_selected(&*control).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn try_select(
        &self,
        locator: Locator<'_>,
        mode: ClickMode,
        clicks: &mut Vec<ClickMode>,
    ) -> Result<(), BrowserError> {
        let control = self.control(locator).await?;
        control.scroll_into_view().await?;
        clicks.push(mode);
        control.click(mode).await?;
        drop(control);

        // The filter panel re-renders after a click, so every poll looks
        // the control up again instead of reusing the clicked handle.
        let verify = async {
            while !self.reads_selected(locator).await {
                tokio::time::sleep(self.policy.poll_interval).await;
            }
        };
        tokio::time::timeout(self.policy.verify_timeout, verify)
            .await
            .map_err(|_| {
                BrowserError::Timeout(
                    self.policy.verify_timeout,
                    format!("{} to become selected", locator.as_str()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeDocument, FakeNode, FakePage, Toggle};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            presence_timeout: Duration::from_millis(10),
            verify_timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(5),
            backoff: Duration::from_millis(1),
        }
    }

    fn toggle(spec: &FilterSpec, class: &str, toggle: Toggle) -> (FakeDocument, FakeNode) {
        let node = FakeNode::new()
            .attr("id", &spec.id())
            .attr("class", class)
            .toggle(toggle);
        (FakeDocument::new().node(&spec.selector(), node.clone()), node)
    }

    #[test]
    fn filter_selector_is_built_from_category_and_token() {
        let spec = FilterSpec::new("seniority", "junior");
        assert_eq!(spec.id(), "seniority-junior");
        assert_eq!(spec.selector(), "[id='seniority-junior']");
    }

    #[test]
    fn escalates_to_forced_click() {
        assert_eq!(RetryPolicy::click_mode(1), ClickMode::Normal);
        assert_eq!(RetryPolicy::click_mode(2), ClickMode::Forced);
        assert_eq!(RetryPolicy::click_mode(3), ClickMode::Forced);
    }

    #[tokio::test]
    async fn already_selected_filter_is_not_clicked() {
        let spec = FilterSpec::new("seniority", "junior");
        let (doc, node) = toggle(&spec, "filter-option selected", Toggle::Selects);
        let page = FakePage::showing(doc);

        let outcomes = FilterSynchronizer::new(&page, fast_policy())
            .apply(&[spec.clone()], Duration::from_millis(10))
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].state, FilterState::AlreadySelected);
        assert!(outcomes[0].clicks.is_empty());
        assert!(node.clicks().is_empty());
        assert!(node.class().contains("selected"));
    }

    #[tokio::test]
    async fn unselected_filter_is_clicked_once() {
        let spec = FilterSpec::new("japanese_level", "not_required");
        let (doc, node) = toggle(&spec, "filter-option", Toggle::Selects);
        let page = FakePage::showing(doc);

        let outcomes = FilterSynchronizer::new(&page, fast_policy())
            .apply(&[spec], Duration::from_millis(10))
            .await;

        assert_eq!(outcomes[0].state, FilterState::Selected);
        assert_eq!(node.clicks(), vec![ClickMode::Normal]);
    }

    #[tokio::test]
    async fn applying_twice_leaves_filters_on() {
        let junior = FilterSpec::new("seniority", "junior");
        let remote = FilterSpec::new("remote_work", "full_remote");
        let junior_node = FakeNode::new().attr("class", "").toggle(Toggle::Selects);
        let remote_node = FakeNode::new().attr("class", "selected").toggle(Toggle::Selects);
        let page = FakePage::showing(
            FakeDocument::new()
                .node(&junior.selector(), junior_node.clone())
                .node(&remote.selector(), remote_node.clone()),
        );
        let sync = FilterSynchronizer::new(&page, fast_policy());
        let specs = [junior, remote];

        let first = sync.apply(&specs, Duration::from_millis(10)).await;
        let second = sync.apply(&specs, Duration::from_millis(10)).await;

        assert_eq!(first[0].state, FilterState::Selected);
        assert_eq!(first[1].state, FilterState::AlreadySelected);
        assert!(
            second
                .iter()
                .all(|o| o.state == FilterState::AlreadySelected && o.clicks.is_empty())
        );
        assert_eq!(junior_node.clicks().len(), 1);
        assert!(remote_node.clicks().is_empty());
    }

    #[tokio::test]
    async fn stubborn_filter_needs_forced_click() {
        let spec = FilterSpec::new("skill", "rust");
        let (doc, node) = toggle(&spec, "", Toggle::SelectsWhenForced);
        let page = FakePage::showing(doc);

        let outcomes = FilterSynchronizer::new(&page, fast_policy())
            .apply(&[spec], Duration::from_millis(10))
            .await;

        assert_eq!(outcomes[0].state, FilterState::Selected);
        assert_eq!(node.clicks(), vec![ClickMode::Normal, ClickMode::Forced]);
    }

    #[tokio::test]
    async fn rerendered_toggle_is_clicked_once() {
        let spec = FilterSpec::new("remote_work", "full_remote");
        let node = FakeNode::new()
            .attr("class", "filter-option")
            .toggle(Toggle::Selects)
            .rerenders();
        let page = FakePage::showing(FakeDocument::new().node(&spec.selector(), node.clone()));
        let sync = FilterSynchronizer::new(&page, fast_policy());

        let first = sync.apply(&[spec.clone()], Duration::from_millis(10)).await;
        let second = sync.apply(&[spec], Duration::from_millis(10)).await;

        assert_eq!(first[0].state, FilterState::Selected);
        assert_eq!(first[0].clicks, vec![ClickMode::Normal]);
        assert_eq!(second[0].state, FilterState::AlreadySelected);
        assert_eq!(node.clicks(), vec![ClickMode::Normal]);
        assert!(node.class().contains("selected"));
    }

    #[tokio::test]
    async fn late_selection_is_not_clicked_off() {
        let spec = FilterSpec::new("seniority", "senior");
        let (doc, node) = toggle(
            &spec,
            "filter-option",
            Toggle::SelectsAfter(Duration::from_millis(30)),
        );
        let page = FakePage::showing(doc);
        let policy = RetryPolicy {
            verify_timeout: Duration::from_millis(20),
            backoff: Duration::from_millis(20),
            ..fast_policy()
        };

        let outcomes = FilterSynchronizer::new(&page, policy)
            .apply(&[spec], Duration::from_millis(10))
            .await;

        assert_eq!(outcomes[0].state, FilterState::Selected);
        assert_eq!(node.clicks(), vec![ClickMode::Normal]);
        assert!(node.class().contains("selected"));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let spec = FilterSpec::new("salary", "over_12m");
        let (doc, node) = toggle(&spec, "", Toggle::Inert);
        let page = FakePage::showing(doc);

        let outcomes = FilterSynchronizer::new(&page, fast_policy())
            .apply(&[spec], Duration::from_millis(10))
            .await;

        assert_eq!(outcomes[0].state, FilterState::Failed);
        assert_eq!(
            node.clicks(),
            vec![ClickMode::Normal, ClickMode::Forced, ClickMode::Forced]
        );
    }

    #[tokio::test]
    async fn missing_control_fails_without_clicks() {
        let page = FakePage::showing(FakeDocument::new());
        let outcomes = FilterSynchronizer::new(&page, fast_policy())
            .apply(&[FilterSpec::new("skill", "cobol")], Duration::from_millis(10))
            .await;

        assert_eq!(outcomes[0].state, FilterState::Failed);
        assert!(outcomes[0].clicks.is_empty());
    }

    #[tokio::test]
    async fn duplicate_specs_are_applied_once() {
        let spec = FilterSpec::new("seniority", "junior");
        let (doc, node) = toggle(&spec, "", Toggle::Selects);
        let page = FakePage::showing(doc);

        let outcomes = FilterSynchronizer::new(&page, fast_policy())
            .apply(&[spec.clone(), spec], Duration::from_millis(10))
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(node.clicks().len(), 1);
    }

    #[tokio::test]
    async fn search_term_is_typed_into_the_box() {
        let search = FakeNode::new();
        let page = FakePage::showing(FakeDocument::new().node(".ais-SearchBox-input", search.clone()));

        FilterSynchronizer::new(&page, fast_policy())
            .submit_search(Locator::Css(".ais-SearchBox-input"), "rust", Duration::from_millis(10))
            .await;

        assert_eq!(search.typed(), vec!["rust".to_string()]);
    }

    #[test]
    fn summary_counts_states() {
        let outcome = |state| FilterOutcome {
            spec: FilterSpec::new("a", "b"),
            state,
            clicks: Vec::new(),
        };
        let summary = FilterSummary::of(&[
            outcome(FilterState::AlreadySelected),
            outcome(FilterState::Selected),
            outcome(FilterState::Selected),
            outcome(FilterState::Failed),
        ]);
        assert_eq!(
            summary,
            FilterSummary {
                already_selected: 1,
                selected: 2,
                failed: 1
            }
        );
    }
}
