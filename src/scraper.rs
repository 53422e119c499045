use std::time::Duration;

use agenda_parser::geometry::{columns, extract_block};
use agenda_parser::{parse_fixtures, ClassEvent, EventBlock, Fixture, HeaderCell, WeekSnapshot};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::browser::{BrowserSession, Query};
use crate::error::{Error, Result};

pub const DEFAULT_WEEKS: usize = 12;
pub const DEFAULT_HOUR_OFFSET: i64 = 1;
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1500);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(15);

/// CSS selectors of the week-view widget. Defaults match a FullCalendar
/// `timeGridWeek` view.
#[derive(Debug, Clone)]
pub struct WidgetSelectors {
    pub header: String,
    pub header_date_attribute: String,
    pub event: String,
    pub event_time: String,
    pub event_title: String,
    pub next: String,
}

impl Default for WidgetSelectors {
    fn default() -> Self {
        Self {
            header: ".fc-col-header-cell".to_string(),
            header_date_attribute: "data-date".to_string(),
            event: ".fc-timegrid-event".to_string(),
            event_time: ".fc-event-time".to_string(),
            event_title: ".fc-event-title".to_string(),
            next: ".fc-next-button".to_string(),
        }
    }
}

/// Where class events come from.
#[async_trait]
pub trait CalendarSource: Send {
    /// Classes of `weeks` weeks starting with the one containing `today`.
    async fn class_events(&mut self, weeks: usize, today: NaiveDate) -> Vec<ClassEvent>;
}

/// Reads classes off a client-rendered week view whose event blocks carry no
/// date, by matching their position against the day headers.
#[derive(Debug, Clone)]
pub struct ClassScraper {
    pub url: String,
    pub selectors: WidgetSelectors,
    pub hour_offset: i64,
    pub settle: Duration,
    pub render_timeout: Duration,
}

impl ClassScraper {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            selectors: WidgetSelectors::default(),
            hour_offset: DEFAULT_HOUR_OFFSET,
            settle: DEFAULT_SETTLE,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    /// Walks up to `weeks` weeks forward. Never fails: whatever was read
    /// before a failure is returned.
    pub async fn scrape<S: BrowserSession + ?Sized>(
        &self,
        session: &mut S,
        weeks: usize,
        today: NaiveDate,
    ) -> Vec<ClassEvent> {
        let mut events = Vec::new();

        if let Err(err) = self.open(session).await {
            log::error!("{err}");
            return events;
        }

        let mut reference = today;

        for week in 1..=weeks {
            match self.read_week(session).await {
                Ok(snapshot) => {
                    let (found, first_day) = self.extract(&snapshot, reference);
                    log::info!("Week {week}: {} classes", found.len());
                    events.extend(found);
                    reference = first_day.unwrap_or(reference) + Days::new(7);
                }
                Err(err) => {
                    log::warn!("Skipping week {week}: {err}");
                    reference = reference + Days::new(7);
                }
            }

            if week == weeks {
                break;
            }

            match session.click(&self.selectors.next).await {
                Ok(true) => tokio::time::sleep(self.settle).await,
                Ok(false) => {
                    log::info!("No next-week control, stopping after {week} weeks");
                    break;
                }
                Err(err) => {
                    log::error!("{err}");
                    break;
                }
            }
        }

        events
    }

    async fn open<S: BrowserSession + ?Sized>(&self, session: &mut S) -> Result<()> {
        session.goto(&self.url).await?;

        if !session.wait_for(&self.selectors.header, self.render_timeout).await? {
            return Err(Error::ScrapeTransport(format!(
                "calendar at {} did not render within {:?}",
                self.url, self.render_timeout
            )));
        }

        Ok(())
    }

    async fn read_week<S: BrowserSession + ?Sized>(&self, session: &mut S) -> Result<WeekSnapshot> {
        let selectors = &self.selectors;

        if !session.wait_for(&selectors.event, self.render_timeout).await? {
            log::debug!("No events rendered within {:?}", self.render_timeout);
            return Ok(WeekSnapshot::default());
        }

        let headers = session
            .query(&Query {
                selector: &selectors.header,
                attribute: Some(selectors.header_date_attribute.as_str()),
                children: &[],
            })
            .await?
            .into_iter()
            .map(|node| HeaderCell {
                date: node.attribute,
                text: node.text,
                rect: node.rect,
            })
            .collect();

        let blocks = session
            .query(&Query {
                selector: &selectors.event,
                attribute: None,
                children: &[selectors.event_time.as_str(), selectors.event_title.as_str()],
            })
            .await?
            .into_iter()
            .map(|node| {
                let mut children = node.children.into_iter();
                EventBlock {
                    rect: node.rect,
                    time: children.next().flatten(),
                    title: children.next().flatten(),
                    text: node.text,
                }
            })
            .collect();

        Ok(WeekSnapshot { headers, blocks })
    }

    /// Classes of one week plus the date of its first column.
    fn extract(&self, snapshot: &WeekSnapshot, reference: NaiveDate) -> (Vec<ClassEvent>, Option<NaiveDate>) {
        let columns = columns(&snapshot.headers, reference);
        if columns.is_empty() && !snapshot.blocks.is_empty() {
            log::warn!("{} event blocks but no readable day headers", snapshot.blocks.len());
        }

        let mut events = Vec::with_capacity(snapshot.blocks.len());
        for block in &snapshot.blocks {
            match extract_block(&columns, block, self.hour_offset) {
                Ok(event) => events.push(event),
                Err(skipped) => {
                    let err = Error::ScrapeExtraction {
                        what: format!("event `{}`", block.text.replace('\n', " | ")),
                        reason: skipped.to_string(),
                    };
                    log::debug!("{err}");
                }
            }
        }

        let first_day = columns.iter().map(|column| column.date).min();
        (events, first_day)
    }
}

/// The widget scraper bound to a live session.
pub struct WidgetCalendar<'a, S: ?Sized> {
    scraper: &'a ClassScraper,
    session: &'a mut S,
}

impl<'a, S: BrowserSession + ?Sized> WidgetCalendar<'a, S> {
    pub fn new(scraper: &'a ClassScraper, session: &'a mut S) -> Self {
        Self { scraper, session }
    }
}

#[async_trait]
impl<'a, S: BrowserSession + ?Sized> CalendarSource for WidgetCalendar<'a, S> {
    async fn class_events(&mut self, weeks: usize, today: NaiveDate) -> Vec<ClassEvent> {
        self.scraper.scrape(&mut *self.session, weeks, today).await
    }
}

/// Home fixtures of one club from a public fixture listing.
#[derive(Debug, Clone)]
pub struct FixtureScraper {
    pub url: String,
    pub club: String,
    pub table: String,
    pub cookie_consent: String,
    pub render_timeout: Duration,
}

impl FixtureScraper {
    pub fn new<U: Into<String>, C: Into<String>>(url: U, club: C) -> Self {
        Self {
            url: url.into(),
            club: club.into(),
            table: "table tr".to_string(),
            cookie_consent: "#onetrust-accept-btn-handler, .cookie-accept, button[id*=accept]".to_string(),
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    /// Never fails; a listing that cannot be loaded yields no fixtures.
    pub async fn scrape_home_fixtures<S: BrowserSession + ?Sized>(&self, session: &mut S) -> Vec<Fixture> {
        match self.try_scrape(session).await {
            Ok(fixtures) => {
                log::info!("{} home fixtures for {}", fixtures.len(), self.club);
                fixtures
            }
            Err(err) => {
                log::error!("{err}");
                Vec::new()
            }
        }
    }

    async fn try_scrape<S: BrowserSession + ?Sized>(&self, session: &mut S) -> Result<Vec<Fixture>> {
        session.goto(&self.url).await?;
        self.dismiss_cookies(session).await;

        if !session.wait_for(&self.table, self.render_timeout).await? {
            return Err(Error::ScrapeTransport(format!(
                "fixture table at {} did not render within {:?}",
                self.url, self.render_timeout
            )));
        }

        let html = session.source().await?;
        Ok(parse_fixtures(html, &self.club))
    }

    async fn dismiss_cookies<S: BrowserSession + ?Sized>(&self, session: &mut S) {
        let banner = session
            .wait_for(&self.cookie_consent, Duration::from_secs(2))
            .await;

        if !matches!(banner, Ok(true)) {
            return;
        }

        match session.click(&self.cookie_consent).await {
            Ok(true) => log::debug!("Dismissed cookie banner"),
            Ok(false) => {}
            Err(err) => log::debug!("Cookie banner not dismissed: {err}"),
        }
    }
}
