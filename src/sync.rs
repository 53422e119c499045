//! One synchronization run: refresh whatever cache went stale, sharing a
//! single browser session between the scrapers.

use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use serde::Serialize;

use crate::browser::{BrowserSession, SessionConnector};
use crate::cache::{self, is_fresh, load_or_refresh, CacheStore, FileCache, Origin, Refreshed};
use crate::model::{ClassEvent, Fixture};
use crate::scraper::{CalendarSource, ClassScraper, FixtureScraper, WidgetCalendar};
use crate::timetable::StaticTimetable;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy)]
pub enum ClassOrigin<'a> {
    Widget(&'a ClassScraper),
    Timetable(&'a StaticTimetable),
}

/// What to refresh and where to keep it.
#[derive(Debug, Clone)]
pub struct Plan<'a> {
    pub classes: Option<ClassOrigin<'a>>,
    pub fixtures: Option<&'a FixtureScraper>,
    pub class_cache: &'a FileCache<ClassEvent>,
    pub fixture_cache: &'a FileCache<Fixture>,
    pub cache: cache::Config,
    pub weeks: usize,
    /// Upper bound for the whole run, browser work included.
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub count: usize,
    pub origin: Origin,
}

impl<T> From<&Refreshed<T>> for SourceReport {
    fn from(refreshed: &Refreshed<T>) -> Self {
        Self {
            count: refreshed.items.len(),
            origin: refreshed.origin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub classes: SourceReport,
    pub fixtures: SourceReport,
    pub browser_started: bool,
    pub timed_out: bool,
}

fn is_due(modified: Option<SystemTime>, config: &cache::Config, now: SystemTime) -> bool {
    config.force || modified.map_or(true, |modified| !is_fresh(modified, now, config.ttl))
}

/// Refreshes stale caches. Never fails: sources that cannot be scraped keep
/// their cached contents. The browser session, if one was started, is closed
/// before returning, also when the run times out.
pub async fn synchronize<C: SessionConnector>(connector: &C, plan: &Plan<'_>, today: NaiveDate) -> SyncReport {
    let now = SystemTime::now();

    let classes_due = matches!(plan.classes, Some(ClassOrigin::Widget(_)))
        && is_due(plan.class_cache.modified(), &plan.cache, now);
    let fixtures_due = plan.fixtures.is_some() && is_due(plan.fixture_cache.modified(), &plan.cache, now);

    let mut session = None;
    if classes_due || fixtures_due {
        match connector.connect().await {
            Ok(connected) => session = Some(connected),
            Err(err) => log::error!("{err}, keeping cached data"),
        }
    } else {
        log::info!("Caches are fresh, not starting a browser");
    }
    let browser_started = session.is_some();

    let outcome = tokio::time::timeout(plan.timeout, refresh_all(plan, session.as_mut(), now, today)).await;

    if let Some(mut session) = session {
        if let Err(err) = session.close().await {
            log::warn!("Failed to close browser session: {err}");
        }
    }

    match outcome {
        Ok((classes, fixtures)) => SyncReport {
            classes,
            fixtures,
            browser_started,
            timed_out: false,
        },
        Err(_) => {
            log::error!("Synchronization did not finish within {:?}", plan.timeout);
            SyncReport {
                classes: SourceReport::from(&Refreshed::stale(plan.class_cache)),
                fixtures: SourceReport::from(&Refreshed::stale(plan.fixture_cache)),
                browser_started,
                timed_out: true,
            }
        }
    }
}

async fn refresh_all<S: BrowserSession>(
    plan: &Plan<'_>,
    mut session: Option<&mut S>,
    now: SystemTime,
    today: NaiveDate,
) -> (SourceReport, SourceReport) {
    let classes = match (plan.classes, session.as_deref_mut()) {
        (Some(ClassOrigin::Timetable(timetable)), _) => {
            let mut source = timetable.clone();
            refresh_classes(&mut source, plan, now, today).await
        }
        (Some(ClassOrigin::Widget(scraper)), Some(session)) => {
            let mut source = WidgetCalendar::new(scraper, session);
            refresh_classes(&mut source, plan, now, today).await
        }
        _ => Refreshed::stale(plan.class_cache),
    };
    log::info!("{} classes ({:?})", classes.items.len(), classes.origin);

    let fixtures = match (plan.fixtures, session) {
        (Some(scraper), Some(session)) => {
            load_or_refresh(plan.fixture_cache, &plan.cache, now, scraper.scrape_home_fixtures(session)).await
        }
        _ => Refreshed::stale(plan.fixture_cache),
    };
    log::info!("{} fixtures ({:?})", fixtures.items.len(), fixtures.origin);

    (SourceReport::from(&classes), SourceReport::from(&fixtures))
}

async fn refresh_classes(
    source: &mut dyn CalendarSource,
    plan: &Plan<'_>,
    now: SystemTime,
    today: NaiveDate,
) -> Refreshed<ClassEvent> {
    load_or_refresh(plan.class_cache, &plan.cache, now, source.class_events(plan.weeks, today)).await
}
