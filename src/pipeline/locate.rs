//! Ordered locator fallback.
//!
//! A field is described by a chain of lookups. The first lookup whose
//! locator matches anything decides the value; later lookups are only
//! consulted when earlier ones match nothing.

use async_trait::async_trait;

use crate::browser::{Element, Locator, Page};
use crate::error::BrowserError;
use crate::pipeline::parse::squash_whitespace;

/// Anything elements can be looked up under: a whole page or one element.
#[async_trait]
pub trait Scope: Send + Sync {
    async fn find(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError>;
}

#[async_trait]
impl Scope for dyn Page + '_ {
    async fn find(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError> {
        self.locate(locator).await
    }
}

#[async_trait]
impl Scope for dyn Element + '_ {
    async fn find(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError> {
        self.locate(locator).await
    }
}

/// How to turn matched elements into a value.
#[derive(Debug, Clone, Copy)]
pub enum Extract {
    /// Visible text of the first match.
    Text,
    /// Inner markup of the first match.
    Html,
    /// An attribute of the first match.
    Attr(&'static str),
    /// Visible text of the last match.
    LastText,
    /// Text of every match, one per line.
    AllText,
    /// Text of the first match accepted by the predicate.
    FirstTextWhere(fn(&str) -> bool),
}

#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub locator: Locator<'static>,
    pub extract: Extract,
}

impl Lookup {
    pub const fn css(selector: &'static str, extract: Extract) -> Self {
        Self {
            locator: Locator::Css(selector),
            extract,
        }
    }

    pub const fn xpath(expr: &'static str, extract: Extract) -> Self {
        Self {
            locator: Locator::XPath(expr),
            extract,
        }
    }
}

/// First element matched by the first locator that matches anything.
pub async fn first_match<S>(
    scope: &S,
    locators: &[Locator<'_>],
) -> Result<Option<Box<dyn Element>>, BrowserError>
where
    S: Scope + ?Sized,
{
    for locator in locators {
        let mut found = scope.find(*locator).await?;
        if !found.is_empty() {
            return Ok(Some(found.swap_remove(0)));
        }
    }
    Ok(None)
}

/// All elements matched by the first locator that matches anything.
pub async fn all_matches<S>(
    scope: &S,
    locators: &[Locator<'_>],
) -> Result<Vec<Box<dyn Element>>, BrowserError>
where
    S: Scope + ?Sized,
{
    for locator in locators {
        let found = scope.find(*locator).await?;
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn apply(extract: Extract, found: &[Box<dyn Element>]) -> Result<Option<String>, BrowserError> {
    match extract {
        Extract::Text => match found.first() {
            Some(el) => Ok(non_empty(el.text().await?)),
            None => Ok(None),
        },
        Extract::Html => match found.first() {
            Some(el) => Ok(non_empty(el.inner_html().await?)),
            None => Ok(None),
        },
        Extract::Attr(name) => match found.first() {
            Some(el) => Ok(el.attr(name).await?.and_then(non_empty)),
            None => Ok(None),
        },
        Extract::LastText => match found.last() {
            Some(el) => Ok(non_empty(el.text().await?)),
            None => Ok(None),
        },
        Extract::AllText => {
            let mut lines = Vec::with_capacity(found.len());
            for el in found {
                let line = squash_whitespace(&el.text().await?);
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Ok(non_empty(lines.join("\n")))
        }
        Extract::FirstTextWhere(accept) => {
            for el in found {
                let text = squash_whitespace(&el.text().await?);
                if accept(&text) {
                    return Ok(Some(text));
                }
            }
            Ok(None)
        }
    }
}

/// Evaluate a lookup chain. Returns the value from the first lookup whose
/// locator matches at least one element, or `None` if nothing matches.
pub async fn resolve<S>(scope: &S, chain: &[Lookup]) -> Result<Option<String>, BrowserError>
where
    S: Scope + ?Sized,
{
    for lookup in chain {
        let found = scope.find(lookup.locator).await?;
        if !found.is_empty() {
            return apply(lookup.extract, &found).await;
        }
    }
    Ok(None)
}

/// [`resolve`], with read failures reported as a missing value.
pub async fn extract_or_default<S>(scope: &S, field: &str, chain: &[Lookup]) -> Option<String>
where
    S: Scope + ?Sized,
{
    match resolve(scope, chain).await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Could not read {field}: {e}");
            None
        }
    }
}
