//! Browser automation capability.
//!
//! The scrape pipeline only talks to these traits. `webdriver` drives a
//! real browser over the W3C WebDriver protocol; `fake` is a scripted
//! stand-in used by the tests.

pub mod webdriver;

#[cfg(test)]
pub mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;

/// An element query, either CSS or XPath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    Css(&'a str),
    XPath(&'a str),
}

impl<'a> Locator<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl<'a> From<Locator<'a>> for fantoccini::Locator<'a> {
    fn from(locator: Locator<'a>) -> Self {
        match locator {
            Locator::Css(s) => fantoccini::Locator::Css(s),
            Locator::XPath(s) => fantoccini::Locator::XPath(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    /// A regular user-style click; fails if the element is covered or hidden.
    Normal,
    /// Dispatches the click from script, bypassing visibility and overlay checks.
    Forced,
}

/// Session-wide settings chosen per site.
#[derive(Debug, Clone, Copy)]
pub struct LaunchOptions {
    pub block_images: bool,
    pub page_load_timeout: Duration,
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, options: LaunchOptions) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Open a new page, isolated from any other open page.
    async fn open_page(&self) -> Result<Box<dyn Page>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// All elements currently matching `locator`; empty when none match.
    async fn locate(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError>;

    /// Wait until at least one element matches `locator`.
    async fn wait_for(&self, locator: Locator<'_>, timeout: Duration) -> Result<(), BrowserError>;

    /// Wait until the page stops issuing network requests.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), BrowserError>;

    async fn title(&self) -> Result<String, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait Element: Send + Sync {
    async fn text(&self) -> Result<String, BrowserError>;

    async fn inner_html(&self) -> Result<String, BrowserError>;

    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError>;

    /// Elements below this one matching `locator`.
    async fn locate(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError>;

    async fn click(&self, mode: ClickMode) -> Result<(), BrowserError>;

    async fn scroll_into_view(&self) -> Result<(), BrowserError>;

    /// Replace the element's value with `text` and press Enter.
    async fn type_and_submit(&self, text: &str) -> Result<(), BrowserError>;
}
