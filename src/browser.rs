//! Headless browser sessions.
//!
//! Scrapers talk to a [`BrowserSession`] rather than to WebDriver directly so
//! the page-walking logic can run against scripted sessions in tests.

use std::time::Duration;

use agenda_parser::Rect;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;

use crate::error::Result;

/// What to read from every element matching `selector`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<'a> {
    pub selector: &'a str,
    pub attribute: Option<&'a str>,
    /// Descendant selectors whose first match's text is read.
    pub children: &'a [&'a str],
}

/// A rendered element as read back from the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub rect: Rect,
    pub text: String,
    pub attribute: Option<String>,
    /// One slot per [`Query::children`] selector, `None` when it matched nothing.
    pub children: Vec<Option<String>>,
}

#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// `Ok(false)` when nothing matched `selector` within `timeout`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn query(&mut self, query: &Query<'_>) -> Result<Vec<Node>>;

    /// Clicks the first match. `Ok(false)` when there is none.
    async fn click(&mut self, selector: &str) -> Result<bool>;

    /// The current DOM serialized as HTML.
    async fn source(&mut self) -> Result<String>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    type Session: BrowserSession + 'static;

    async fn connect(&self) -> Result<Self::Session>;
}

/// Starts sessions on a running WebDriver server (chromedriver, geckodriver).
#[derive(Debug, Clone)]
pub struct WebDriverConnector {
    pub url: String,
    pub headless: bool,
}

#[async_trait]
impl SessionConnector for WebDriverConnector {
    type Session = WebDriverSession;

    async fn connect(&self) -> Result<WebDriverSession> {
        let mut capabilities = serde_json::Map::new();
        if self.headless {
            capabilities.insert(
                "goog:chromeOptions".to_string(),
                json!({ "args": ["--headless=new", "--disable-gpu", "--window-size=1920,1080"] }),
            );
            capabilities.insert("moz:firefoxOptions".to_string(), json!({ "args": ["-headless"] }));
        }

        log::debug!("Connecting to WebDriver at {}", self.url);
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(&self.url)
            .await?;

        Ok(WebDriverSession {
            client,
            closed: false,
        })
    }
}

pub struct WebDriverSession {
    client: Client,
    closed: bool,
}

async fn read_node(element: &Element, query: &Query<'_>) -> Result<Node, CmdError> {
    let (x, y, width, height) = element.rectangle().await?;
    let text = element.text().await?;

    let attribute = match query.attribute {
        Some(name) => element.attr(name).await?,
        None => None,
    };

    let mut children = Vec::with_capacity(query.children.len());
    for selector in query.children {
        let child = match element.find_all(Locator::Css(selector)).await?.first() {
            Some(child) => Some(child.text().await?),
            None => None,
        };
        children.push(child);
    }

    Ok(Node {
        rect: Rect::new(x, y, width, height),
        text,
        attribute,
        children,
    })
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        log::debug!("Navigating to {url}");
        self.client.goto(url).await?;
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn query(&mut self, query: &Query<'_>) -> Result<Vec<Node>> {
        let elements = self.client.find_all(Locator::Css(query.selector)).await?;
        let mut nodes = Vec::with_capacity(elements.len());

        // Elements can go stale while the widget re-renders; lose only those.
        for element in &elements {
            match read_node(element, query).await {
                Ok(node) => nodes.push(node),
                Err(err) => log::debug!("Skipping unreadable `{}` element: {err}", query.selector),
            }
        }

        Ok(nodes)
    }

    async fn click(&mut self, selector: &str) -> Result<bool> {
        let elements = self.client.find_all(Locator::Css(selector)).await?;
        let Some(element) = elements.first() else {
            return Ok(false);
        };

        element.click().await?;
        Ok(true)
    }

    async fn source(&mut self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.client.clone().close().await?;
        log::debug!("Browser session closed");
        Ok(())
    }
}
