#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use study_agenda::browser::{BrowserSession, Node, Query, SessionConnector};
use study_agenda::scraper::WidgetSelectors;
use study_agenda::{Error, Result};

use agenda_parser::Rect;

/// What the widget shows for one week.
#[derive(Debug, Clone, Default)]
pub struct Week {
    pub headers: Vec<Node>,
    pub events: Vec<Node>,
}

/// Five day columns, 100px wide, starting at x = 100.
pub fn work_week(dates: [&str; 5]) -> Vec<Node> {
    dates
        .iter()
        .enumerate()
        .map(|(i, date)| Node {
            rect: Rect::new(100.0 * (i + 1) as f64, 0.0, 100.0, 30.0),
            text: String::new(),
            attribute: Some(date.to_string()),
            children: Vec::new(),
        })
        .collect()
}

pub fn block(x: f64, time: Option<&str>, title: Option<&str>, text: &str) -> Node {
    Node {
        rect: Rect::new(x, 200.0, 80.0, 60.0),
        text: text.to_string(),
        attribute: None,
        children: vec![time.map(str::to_string), title.map(str::to_string)],
    }
}

/// A cookie banner covering the page until its button is clicked.
#[derive(Debug, Clone)]
pub struct Banner {
    pub button: String,
    /// The click errors out instead of dismissing the banner.
    pub broken: bool,
    pub shown: bool,
}

impl Banner {
    pub fn new(button: &str, broken: bool) -> Self {
        Self {
            button: button.to_string(),
            broken,
            shown: true,
        }
    }
}

/// Plays back a scripted widget. Every call is appended to `calls`.
pub struct ScriptedSession {
    pub selectors: WidgetSelectors,
    pub weeks: Vec<Week>,
    pub current: usize,
    pub html: String,
    pub stall: Option<Duration>,
    pub banner: Option<Banner>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSession {
    pub fn new(weeks: Vec<Week>) -> Self {
        Self {
            selectors: WidgetSelectors::default(),
            weeks,
            current: 0,
            html: String::new(),
            stall: None,
            banner: None,
            calls: Arc::default(),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn week(&self) -> Week {
        self.weeks.get(self.current).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.record(format!("goto {url}"));
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        if url.contains("unreachable") {
            return Err(Error::ScrapeTransport(format!("{url} refused the connection")));
        }
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<bool> {
        self.record(format!("wait {selector}"));
        if let Some(banner) = self.banner.as_ref().filter(|banner| banner.button == selector) {
            return Ok(banner.shown);
        }
        let week = self.week();
        Ok(if selector == self.selectors.header {
            !week.headers.is_empty()
        } else if selector == self.selectors.event {
            !week.events.is_empty()
        } else {
            selector.starts_with("table") && self.html.contains("<tr")
        })
    }

    async fn query(&mut self, query: &Query<'_>) -> Result<Vec<Node>> {
        self.record(format!("query {}", query.selector));
        let week = self.week();
        Ok(if query.selector == self.selectors.header {
            week.headers
        } else if query.selector == self.selectors.event {
            week.events
        } else {
            Vec::new()
        })
    }

    async fn click(&mut self, selector: &str) -> Result<bool> {
        self.record(format!("click {selector}"));
        if let Some(banner) = self.banner.as_mut().filter(|banner| banner.button == selector) {
            if banner.broken {
                return Err(Error::ScrapeTransport("element click intercepted".to_string()));
            }
            banner.shown = false;
            return Ok(true);
        }
        if selector == self.selectors.next && self.current + 1 < self.weeks.len() {
            self.current += 1;
            return Ok(true);
        }
        Ok(false)
    }

    async fn source(&mut self) -> Result<String> {
        self.record("source".to_string());
        Ok(self.html.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.record("close".to_string());
        Ok(())
    }
}

/// Hands out one prepared session, or fails to connect when there is none.
pub struct ScriptedConnector {
    pub session: Mutex<Option<ScriptedSession>>,
    pub connects: Mutex<usize>,
}

impl ScriptedConnector {
    pub fn new(session: Option<ScriptedSession>) -> Self {
        Self {
            session: Mutex::new(session),
            connects: Mutex::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl SessionConnector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self) -> Result<ScriptedSession> {
        *self.connects.lock().unwrap() += 1;
        self.session
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::ScrapeTransport("no WebDriver listening".to_string()))
    }
}
