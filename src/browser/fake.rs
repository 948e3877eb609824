//! Scripted in-memory browser for tests.
//!
//! A [`FakeSite`] maps URLs to documents; a document maps locator text to
//! the nodes it matches. Nodes keep their attributes behind shared state
//! so clicks on toggles are observable after the fact.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{BrowserSession, ClickMode, Element, LaunchOptions, Locator, Page, SessionLauncher};
use crate::error::BrowserError;

/// What a click does to a node's `class` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Toggle {
    #[default]
    Inert,
    /// Any click adds `selected`.
    Selects,
    /// Only forced clicks add `selected`.
    SelectsWhenForced,
    /// Any click adds `selected`, but only once the delay has passed.
    SelectsAfter(Duration),
}

#[derive(Clone, Default)]
pub struct FakeNode {
    text: String,
    html: String,
    attrs: Arc<Mutex<HashMap<String, String>>>,
    children: HashMap<String, Vec<FakeNode>>,
    toggle: Toggle,
    clicks: Arc<Mutex<Vec<ClickMode>>>,
    typed: Arc<Mutex<Vec<String>>>,
    pending_select: Arc<Mutex<Option<Instant>>>,
    /// Bumped whenever the node re-renders; handles from older renders are stale.
    generation: Arc<AtomicUsize>,
    seen: usize,
    rerenders: bool,
    fails_reads: bool,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn attr(self, name: &str, value: &str) -> Self {
        self.attrs
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, locator: &str, node: FakeNode) -> Self {
        self.children
            .entry(locator.to_string())
            .or_default()
            .push(node);
        self
    }

    pub fn toggle(mut self, toggle: Toggle) -> Self {
        self.toggle = toggle;
        self
    }

    /// Every click re-renders the node, so handles located before it go stale.
    pub fn rerenders(mut self) -> Self {
        self.rerenders = true;
        self
    }

    /// Every read or lookup on the node fails.
    pub fn fails_reads(mut self) -> Self {
        self.fails_reads = true;
        self
    }

    pub fn clicks(&self) -> Vec<ClickMode> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.typed.lock().unwrap().clone()
    }

    pub fn class(&self) -> String {
        self.settle();
        self.attrs
            .lock()
            .unwrap()
            .get("class")
            .cloned()
            .unwrap_or_default()
    }
}

impl FakeNode {
    /// A fresh handle on the node as currently rendered.
    fn handle(&self) -> FakeNode {
        let mut handle = self.clone();
        handle.seen = self.generation.load(Ordering::SeqCst);
        handle
    }

    fn live(&self) -> Result<(), BrowserError> {
        if self.fails_reads {
            return Err(BrowserError::Command("element read failed".to_string()));
        }
        if self.seen != self.generation.load(Ordering::SeqCst) {
            return Err(BrowserError::Command("stale element reference".to_string()));
        }
        Ok(())
    }

    fn mark_selected(&self) {
        let mut attrs = self.attrs.lock().unwrap();
        let class = attrs.entry("class".to_string()).or_default();
        if !class.split_whitespace().any(|c| c == "selected") {
            class.push_str(" selected");
        }
    }

    /// Apply a delayed selection once it is due.
    fn settle(&self) {
        let mut pending = self.pending_select.lock().unwrap();
        if pending.is_some_and(|due| Instant::now() >= due) {
            *pending = None;
            self.mark_selected();
        }
    }
}

#[async_trait]
impl Element for FakeNode {
    async fn text(&self) -> Result<String, BrowserError> {
        self.live()?;
        Ok(self.text.clone())
    }

    async fn inner_html(&self) -> Result<String, BrowserError> {
        self.live()?;
        Ok(self.html.clone())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError> {
        self.live()?;
        self.settle();
        Ok(self.attrs.lock().unwrap().get(name).cloned())
    }

    async fn locate(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError> {
        self.live()?;
        Ok(boxed(self.children.get(locator.as_str())))
    }

    async fn click(&self, mode: ClickMode) -> Result<(), BrowserError> {
        self.live()?;
        self.clicks.lock().unwrap().push(mode);
        match self.toggle {
            Toggle::Inert => {}
            Toggle::Selects => self.mark_selected(),
            Toggle::SelectsWhenForced if mode == ClickMode::Forced => self.mark_selected(),
            Toggle::SelectsWhenForced => {}
            Toggle::SelectsAfter(delay) => {
                *self.pending_select.lock().unwrap() = Some(Instant::now() + delay);
            }
        }
        if self.rerenders {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<(), BrowserError> {
        self.live()
    }

    async fn type_and_submit(&self, text: &str) -> Result<(), BrowserError> {
        self.live()?;
        self.typed.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn boxed(nodes: Option<&Vec<FakeNode>>) -> Vec<Box<dyn Element>> {
    nodes
        .map(|nodes| {
            nodes
                .iter()
                .map(|n| Box::new(n.handle()) as Box<dyn Element>)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone, Default)]
pub struct FakeDocument {
    title: String,
    nodes: HashMap<String, Vec<FakeNode>>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn node(mut self, locator: &str, node: FakeNode) -> Self {
        self.nodes.entry(locator.to_string()).or_default().push(node);
        self
    }
}

#[derive(Default)]
pub struct FakeSite {
    documents: HashMap<String, FakeDocument>,
    broken: HashSet<String>,
    network_never_idle: bool,
    visits: Mutex<Vec<String>>,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    sessions_closed: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(mut self, url: &str, document: FakeDocument) -> Self {
        self.documents.insert(url.to_string(), document);
        self
    }

    /// Navigation to `url` fails.
    pub fn broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    pub fn network_never_idle(mut self) -> Self {
        self.network_never_idle = true;
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }
}

pub struct FakeLauncher {
    site: Arc<FakeSite>,
    fail: bool,
}

impl FakeLauncher {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self { site, fail: false }
    }

    pub fn failing(site: Arc<FakeSite>) -> Self {
        Self { site, fail: true }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, _options: LaunchOptions) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.fail {
            return Err(BrowserError::Session("webdriver unreachable".to_string()));
        }
        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
        }))
    }
}

pub struct FakeSession {
    site: Arc<FakeSite>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn open_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        self.site.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage::new(Arc::clone(&self.site))))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.site.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    current: Mutex<Option<FakeDocument>>,
}

impl FakePage {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            current: Mutex::new(None),
        }
    }

    /// A page already showing `document`.
    pub fn showing(document: FakeDocument) -> Self {
        Self {
            site: Arc::new(FakeSite::new()),
            current: Mutex::new(Some(document)),
        }
    }

    fn matches(&self, locator: Locator<'_>) -> Vec<Box<dyn Element>> {
        let current = self.current.lock().unwrap();
        boxed(current.as_ref().and_then(|d| d.nodes.get(locator.as_str())))
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.site.visits.lock().unwrap().push(url.to_string());
        if self.site.broken.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        *self.current.lock().unwrap() = Some(self.site.documents.get(url).cloned().unwrap_or_default());
        Ok(())
    }

    async fn locate(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError> {
        Ok(self.matches(locator))
    }

    async fn wait_for(&self, locator: Locator<'_>, timeout: Duration) -> Result<(), BrowserError> {
        if self.matches(locator).is_empty() {
            Err(BrowserError::Timeout(timeout, locator.as_str().to_string()))
        } else {
            Ok(())
        }
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), BrowserError> {
        if self.site.network_never_idle {
            Err(BrowserError::Timeout(timeout, "network idle".to_string()))
        } else {
            Ok(())
        }
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|d| d.title.clone())
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.site.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
