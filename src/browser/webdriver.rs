use std::time::{Duration, Instant};

use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::{Capabilities, WindowHandle};
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};

use super::{BrowserSession, ClickMode, Element, LaunchOptions, Locator, Page, SessionLauncher};
use crate::config::Config;
use crate::error::BrowserError;

/// WebDriver key code for Enter.
const ENTER_KEY: &str = "\u{e007}";

const IDLE_POLL: Duration = Duration::from_millis(250);
const IDLE_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Proxy server parsed from `host:port` or `user:pass@host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub server: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn parse(raw: &str) -> Option<ProxySettings> {
        let raw = raw.trim();
        let raw = raw
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(raw);
        if raw.is_empty() {
            return None;
        }

        match raw.rsplit_once('@') {
            Some((creds, server)) if !server.is_empty() => {
                let (user, pass) = creds
                    .split_once(':')
                    .map(|(u, p)| (u.to_string(), Some(p.to_string())))
                    .unwrap_or_else(|| (creds.to_string(), None));
                Some(ProxySettings {
                    server: server.to_string(),
                    username: Some(user),
                    password: pass,
                })
            }
            Some(_) => None,
            None => Some(ProxySettings {
                server: raw.to_string(),
                username: None,
                password: None,
            }),
        }
    }
}

/// Starts Chrome sessions through a WebDriver endpoint (chromedriver,
/// selenium, ...).
pub struct WebDriverLauncher {
    webdriver_url: String,
    headless: bool,
    user_agent: Option<String>,
    proxy: Option<ProxySettings>,
}

impl WebDriverLauncher {
    pub fn from_config(config: &Config) -> Self {
        let proxy = config.proxy.as_deref().and_then(ProxySettings::parse);
        if proxy.as_ref().is_some_and(|p| p.username.is_some()) {
            tracing::warn!("Proxy credentials are not supported over WebDriver and will be ignored");
        }
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            proxy,
        }
    }

    fn capabilities(&self, options: LaunchOptions) -> Capabilities {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--window-size=1366,900".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={ua}"));
        }
        if let Some(proxy) = &self.proxy {
            args.push(format!("--proxy-server={}", proxy.server));
        }

        let mut chrome = serde_json::Map::new();
        chrome.insert("args".into(), json!(args));
        if options.block_images {
            chrome.insert(
                "prefs".into(),
                json!({ "profile.managed_default_content_settings.images": 2 }),
            );
        }

        let mut caps = Capabilities::new();
        caps.insert("browserName".into(), json!("chrome"));
        caps.insert("goog:chromeOptions".into(), Value::Object(chrome));
        caps.insert(
            "timeouts".into(),
            json!({ "pageLoad": options.page_load_timeout.as_millis() as u64 }),
        );
        caps
    }
}

#[async_trait]
impl SessionLauncher for WebDriverLauncher {
    async fn launch(&self, options: LaunchOptions) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities(options))
            .connect(&self.webdriver_url)
            .await?;
        tracing::debug!("WebDriver session started at {}", self.webdriver_url);
        Ok(Box::new(WebDriverSession { client }))
    }
}

pub struct WebDriverSession {
    client: Client,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn open_page(&self) -> Result<Box<dyn Page>, BrowserError> {
        let opener = self.client.window().await?;
        let window = self.client.new_window(true).await?;
        self.client.switch_to_window(window.handle).await?;
        Ok(Box::new(WebDriverPage {
            client: self.client.clone(),
            opener,
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.client.close().await?;
        Ok(())
    }
}

/// One browser tab. Pages are used one at a time; closing a page hands
/// focus back to the tab that opened it.
pub struct WebDriverPage {
    client: Client,
    opener: WindowHandle,
}

fn wrap_all(client: &Client, elements: Vec<fantoccini::elements::Element>) -> Vec<Box<dyn Element>> {
    elements
        .into_iter()
        .map(|element| {
            Box::new(WebDriverElement {
                client: client.clone(),
                element,
            }) as Box<dyn Element>
        })
        .collect()
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn locate(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError> {
        let found = self.client.find_all(locator.into()).await?;
        Ok(wrap_all(&self.client, found))
    }

    async fn wait_for(&self, locator: Locator<'_>, timeout: Duration) -> Result<(), BrowserError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator.into())
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => {
                Err(BrowserError::Timeout(timeout, locator.as_str().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), BrowserError> {
        let started = Instant::now();
        let mut last_count: Option<u64> = None;
        let mut quiet_since = Instant::now();

        while started.elapsed() < timeout {
            let state = self
                .client
                .execute(
                    "return [document.readyState, performance.getEntriesByType('resource').length];",
                    vec![],
                )
                .await?;
            let ready = state.get(0).and_then(Value::as_str) == Some("complete");
            let count = state.get(1).and_then(Value::as_u64);

            if !ready || count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= IDLE_QUIET_WINDOW {
                return Ok(());
            }
            tokio::time::sleep(IDLE_POLL).await;
        }

        Err(BrowserError::Timeout(timeout, "network idle".to_string()))
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self.client.title().await?)
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.client.close_window().await?;
        self.client.switch_to_window(self.opener).await?;
        Ok(())
    }
}

pub struct WebDriverElement {
    client: Client,
    element: fantoccini::elements::Element,
}

impl WebDriverElement {
    async fn run_script(&self, script: &str) -> Result<(), BrowserError> {
        let arg = serde_json::to_value(&self.element)
            .map_err(|e| BrowserError::Command(format!("Failed to serialize element: {e}")))?;
        self.client.execute(script, vec![arg]).await?;
        Ok(())
    }
}

#[async_trait]
impl Element for WebDriverElement {
    async fn text(&self) -> Result<String, BrowserError> {
        Ok(self.element.text().await?)
    }

    async fn inner_html(&self) -> Result<String, BrowserError> {
        Ok(self.element.html(true).await?)
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.element.attr(name).await?)
    }

    async fn locate(&self, locator: Locator<'_>) -> Result<Vec<Box<dyn Element>>, BrowserError> {
        let found = self.element.find_all(locator.into()).await?;
        Ok(wrap_all(&self.client, found))
    }

    async fn click(&self, mode: ClickMode) -> Result<(), BrowserError> {
        match mode {
            ClickMode::Normal => Ok(self.element.click().await?),
            ClickMode::Forced => self.run_script("arguments[0].click();").await,
        }
    }

    async fn scroll_into_view(&self) -> Result<(), BrowserError> {
        self.run_script("arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});")
            .await
    }

    async fn type_and_submit(&self, text: &str) -> Result<(), BrowserError> {
        self.element.clear().await?;
        self.element.send_keys(&format!("{text}{ENTER_KEY}")).await?;
        Ok(())
    }
}
