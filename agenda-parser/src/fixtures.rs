use chrono::{NaiveDate, NaiveTime};
use scraper::{ElementRef, Html};

use crate::time::parse_hhmm;
use crate::Fixture;

/// Home fixtures of `club` found in a rendered fixture listing.
///
/// Rows without a `DD.MM.YYYY` date, without a `VS` separator, or where the
/// club plays away are skipped.
pub fn parse_fixtures<S: AsRef<str>>(html: S, club: &str) -> Vec<Fixture> {
    let html = Html::parse_document(html.as_ref());

    html.select(selector!("tr"))
        .filter_map(|row| parse_row(&row_cells(row), club))
        .collect()
}

fn row_cells(row: ElementRef) -> Vec<String> {
    row.select(selector!("td, th"))
        .map(|cell| cell.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect()
}

/// A single listing row, already split into cell texts.
pub fn parse_row(cells: &[String], club: &str) -> Option<Fixture> {
    let words = || cells.iter().flat_map(|cell| cell.split_whitespace());

    let date = words().find_map(date_token)?;
    let time = words().find_map(time_token);
    let (home, away) = teams(cells)?;

    if !is_club(&home, club) {
        return None;
    }

    Some(Fixture {
        title: format!("{home} vs {away}"),
        opponent_venue: away,
        date,
        time,
        all_day: time.is_none(),
    })
}

fn date_token(word: &str) -> Option<NaiveDate> {
    let word = word.trim_matches(|c: char| !c.is_ascii_digit());
    if word.split('.').count() != 3 {
        return None;
    }
    NaiveDate::parse_from_str(word, "%d.%m.%Y").ok()
}

fn time_token(word: &str) -> Option<NaiveTime> {
    parse_hhmm(word.trim_matches(|c: char| !c.is_ascii_digit()))
}

fn is_vs(word: &str) -> bool {
    word.trim_end_matches('.').eq_ignore_ascii_case("vs")
}

fn team_name<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    words
        .into_iter()
        .filter(|word| date_token(word).is_none() && time_token(word).is_none())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Team names on either side of the `VS` token, looking into the
/// neighbouring cells when the separator sits in a cell of its own.
fn teams(cells: &[String]) -> Option<(String, String)> {
    let index = cells
        .iter()
        .position(|cell| cell.split_whitespace().any(is_vs))?;

    let words = cells[index].split_whitespace().collect::<Vec<_>>();
    let at = words.iter().position(|word| is_vs(word))?;

    let mut home = team_name(words[..at].iter().copied());
    let mut away = team_name(words[at + 1..].iter().copied());

    if home.is_empty() {
        home = cells[..index]
            .iter()
            .rev()
            .map(|cell| team_name(cell.split_whitespace()))
            .find(|name| !name.is_empty())?;
    }

    if away.is_empty() {
        away = cells[index + 1..]
            .iter()
            .map(|cell| team_name(cell.split_whitespace()))
            .find(|name| !name.is_empty())?;
    }

    Some((home, away))
}

/// Whole-name match, ignoring case and surrounding whitespace.
fn is_club(team: &str, club: &str) -> bool {
    let club = club.trim();
    !club.is_empty() && team.trim().to_lowercase() == club.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <table class="fixtures">
          <tr><th>Fecha</th><th>Hora</th><th>Local</th><th></th><th>Visitante</th></tr>
          <tr><td>08.03.2025</td><td>18:30</td><td>CD Universidad</td><td>VS</td><td>Atlético Norte</td></tr>
          <tr><td>15.03.2025</td><td>12:00</td><td>Racing Sur</td><td>VS</td><td>CD Universidad</td></tr>
          <tr><td>22.03.2025</td><td></td><td>CD Universidad</td><td>VS</td><td>Club Río</td></tr>
          <tr><td>sin fecha</td><td>18:30</td><td>CD Universidad</td><td>VS</td><td>Nadie</td></tr>
          <tr><td>29.03.2025 20:00 CD Universidad B VS Unión Este</td></tr>
        </table>
        </body></html>
    "#;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn keeps_only_home_fixtures_of_the_club() {
        let fixtures = parse_fixtures(LISTING, "cd universidad");
        let titles = fixtures.iter().map(|f| f.title.as_str()).collect::<Vec<_>>();
        assert_eq!(
            titles,
            vec![
                "CD Universidad vs Atlético Norte",
                "CD Universidad vs Club Río",
            ]
        );
    }

    #[test]
    fn reserve_side_is_not_the_club() {
        assert!(is_club(" CD Universidad ", "cd universidad"));
        assert!(!is_club("CD Universidad B", "CD Universidad"));

        let fixtures = parse_fixtures(LISTING, "CD Universidad B");
        assert_eq!(fixtures.len(), 1);
        assert_eq!(fixtures[0].opponent_venue, "Unión Este");
        assert_eq!(fixtures[0].time, NaiveTime::from_hms_opt(20, 0, 0));
    }

    #[test]
    fn missing_time_token_means_all_day() {
        let fixtures = parse_fixtures(LISTING, "CD Universidad");
        let tbd = fixtures.iter().find(|f| f.opponent_venue == "Club Río").unwrap();
        assert_eq!(tbd.date, date("2025-03-22"));
        assert!(tbd.all_day);
        assert_eq!(tbd.time, None);

        let timed = &fixtures[0];
        assert!(!timed.all_day);
        assert_eq!(timed.time, NaiveTime::from_hms_opt(18, 30, 0));
    }

    #[test]
    fn rows_without_separator_or_date_are_skipped() {
        let cells = vec!["08.03.2025".to_string(), "CD Universidad - Rival".to_string()];
        assert_eq!(parse_row(&cells, "CD Universidad"), None);

        let cells = vec!["CD Universidad VS Rival".to_string()];
        assert_eq!(parse_row(&cells, "CD Universidad"), None);
    }

    #[test]
    fn empty_club_never_matches() {
        assert!(parse_fixtures(LISTING, "  ").is_empty());
    }
}
