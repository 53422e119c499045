mod common;

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use study_agenda::scraper::{CalendarSource, ClassScraper, FixtureScraper, WidgetCalendar};

use common::{block, work_week, Banner, ScriptedSession, Week};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn scraper() -> ClassScraper {
    ClassScraper {
        settle: Duration::ZERO,
        ..ClassScraper::new("https://campus.example/horario")
    }
}

#[tokio::test]
async fn classes_are_dated_by_their_column() {
    let weeks = vec![
        Week {
            headers: work_week(["2025-03-03", "2025-03-04", "2025-03-05", "2025-03-06", "2025-03-07"]),
            events: vec![
                block(
                    160.0,
                    Some("09:00 - 11:00"),
                    Some("Álgebra / Aula: 1.2"),
                    "09:00 - 11:00\nÁlgebra / Aula: 1.2",
                ),
                block(900.0, Some("12:00 - 13:00"), Some("Fantasma / Aula: 0.0"), ""),
            ],
        },
        Week {
            headers: work_week(["2025-03-10", "2025-03-11", "2025-03-12", "2025-03-13", "2025-03-14"]),
            events: vec![block(460.0, None, None, "12:00 - 13:00\nRedes / Aula:0.4")],
        },
    ];
    let mut session = ScriptedSession::new(weeks);

    let classes = scraper().scrape(&mut session, 12, date("2025-03-03")).await;

    assert_eq!(classes.len(), 2);

    assert_eq!(classes[0].subject, "Álgebra");
    assert_eq!(classes[0].room, "1.2");
    assert_eq!(classes[0].date, date("2025-03-04"));
    assert_eq!(classes[0].time_range.start, hm(10, 0));
    assert_eq!(classes[0].time_range.end, hm(12, 0));

    assert_eq!(classes[1].subject, "Redes");
    assert_eq!(classes[1].room, "0.4");
    assert_eq!(classes[1].date, date("2025-03-14"));
    assert_eq!(classes[1].time_range.start, hm(13, 0));

    let calls = session.calls.lock().unwrap();
    let clicks = calls.iter().filter(|call| call.starts_with("click")).count();
    assert_eq!(clicks, 2, "stops once the next control is gone");
}

#[tokio::test]
async fn a_week_without_events_does_not_end_the_scrape() {
    let weeks = vec![
        Week {
            headers: work_week(["2025-04-14", "2025-04-15", "2025-04-16", "2025-04-17", "2025-04-18"]),
            events: Vec::new(),
        },
        Week {
            headers: work_week(["2025-04-21", "2025-04-22", "2025-04-23", "2025-04-24", "2025-04-25"]),
            events: vec![block(130.0, Some("08:00-09:00"), Some("Física"), "")],
        },
    ];
    let mut session = ScriptedSession::new(weeks);

    let classes = scraper().scrape(&mut session, 2, date("2025-04-14")).await;

    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].date, date("2025-04-21"));
    assert_eq!(classes[0].room, "");
}

#[tokio::test]
async fn widget_that_never_renders_yields_nothing() {
    let mut session = ScriptedSession::new(vec![Week::default()]);

    let classes = scraper().scrape(&mut session, 12, date("2025-03-03")).await;

    assert!(classes.is_empty());
    let calls = session.calls.lock().unwrap();
    assert!(calls.iter().all(|call| !call.starts_with("query") && !call.starts_with("click")));
}

#[tokio::test]
async fn navigation_failure_yields_nothing() {
    let mut session = ScriptedSession::new(Vec::new());
    let scraper = ClassScraper::new("https://unreachable.example/");

    assert!(scraper.scrape(&mut session, 3, date("2025-03-03")).await.is_empty());
}

#[tokio::test]
async fn week_count_bounds_pagination() {
    let week = Week {
        headers: work_week(["2025-03-03", "2025-03-04", "2025-03-05", "2025-03-06", "2025-03-07"]),
        events: vec![block(110.0, Some("10:00 - 11:00"), Some("Tutoría"), "")],
    };
    let mut session = ScriptedSession::new(vec![week; 6]);

    let scraper = scraper();
    let mut source = WidgetCalendar::new(&scraper, &mut session);
    // The scripted headers never move, so every week reads the same day.
    let classes = source.class_events(3, date("2025-03-03")).await;
    assert_eq!(classes.len(), 3);

    let calls = session.calls.lock().unwrap();
    assert_eq!(calls.iter().filter(|call| call.starts_with("click")).count(), 2);
}

const LISTING: &str = r#"
    <html><body><table>
      <tr><td>08.03.2025</td><td>18:30</td><td>CD Universidad</td><td>VS</td><td>Atlético Norte</td></tr>
      <tr><td>15.03.2025</td><td>12:00</td><td>Racing Sur</td><td>VS</td><td>CD Universidad</td></tr>
      <tr><td>22.03.2025</td><td></td><td>CD Universidad</td><td>VS</td><td>Club Río</td></tr>
    </table></body></html>
"#;

#[tokio::test]
async fn home_fixtures_from_the_rendered_listing() {
    let mut session = ScriptedSession::new(Vec::new());
    session.html = LISTING.to_string();

    let scraper = FixtureScraper::new("https://league.example/calendario", "CD Universidad");
    let fixtures = scraper.scrape_home_fixtures(&mut session).await;

    assert_eq!(fixtures.len(), 2);
    assert_eq!(fixtures[0].opponent_venue, "Atlético Norte");
    assert_eq!(fixtures[0].time, Some(hm(18, 30)));
    assert!(fixtures[1].all_day);
    assert_eq!(fixtures[1].title, "CD Universidad vs Club Río");
}

#[tokio::test]
async fn missing_fixture_table_yields_nothing() {
    let mut session = ScriptedSession::new(Vec::new());

    let scraper = FixtureScraper::new("https://league.example/calendario", "CD Universidad");
    assert!(scraper.scrape_home_fixtures(&mut session).await.is_empty());

    let calls = session.calls.lock().unwrap();
    assert!(!calls.iter().any(|call| call == "source"));
}

#[tokio::test]
async fn cookie_banner_is_dismissed_before_reading() {
    let scraper = FixtureScraper::new("https://league.example/calendario", "CD Universidad");
    let mut session = ScriptedSession::new(Vec::new());
    session.html = LISTING.to_string();
    session.banner = Some(Banner::new(&scraper.cookie_consent, false));

    let fixtures = scraper.scrape_home_fixtures(&mut session).await;

    assert_eq!(fixtures.len(), 2);
    assert!(!session.banner.as_ref().unwrap().shown);
    let calls = session.calls.lock().unwrap();
    let click = calls.iter().position(|call| *call == format!("click {}", scraper.cookie_consent));
    let source = calls.iter().position(|call| call == "source");
    assert!(click.unwrap() < source.unwrap());
}

#[tokio::test]
async fn failing_cookie_click_still_reads_fixtures() {
    let scraper = FixtureScraper::new("https://league.example/calendario", "CD Universidad");
    let mut session = ScriptedSession::new(Vec::new());
    session.html = LISTING.to_string();
    session.banner = Some(Banner::new(&scraper.cookie_consent, true));

    let fixtures = scraper.scrape_home_fixtures(&mut session).await;

    assert_eq!(fixtures.len(), 2);
    assert_eq!(fixtures[0].opponent_venue, "Atlético Norte");
    assert!(session.banner.as_ref().unwrap().shown);
}
