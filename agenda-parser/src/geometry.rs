//! Date assignment for a week-view widget whose event blocks carry no date.
//!
//! Every header cell is turned into a [`Column`] covering its rendered
//! horizontal extent. An event block belongs to the column whose half-open
//! range `[x_start, x_end)` contains the block's horizontal center.

use std::fmt;

use chrono::NaiveDate;

use crate::time::TimeRange;
use crate::{ClassEvent, Column, EventBlock, HeaderCell, Rect, WeekSnapshot};

const ROOM_LABELS: [&str; 2] = ["aula:", "room:"];

/// Why a block did not produce a [`ClassEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skipped {
    /// The block's center lies outside every column.
    NoColumn,
    /// Time or title text could not be read.
    Unparseable,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skipped::NoColumn => f.write_str("block lies outside every day column"),
            Skipped::Unparseable => f.write_str("block has no readable time range and title"),
        }
    }
}

/// Builds the column descriptors of one week. Headers whose date cannot be
/// resolved are left out.
pub fn columns(headers: &[HeaderCell], reference: NaiveDate) -> Vec<Column> {
    headers
        .iter()
        .filter_map(|header| {
            let date = header_date(header, reference)?;
            Some(Column {
                date,
                x_start: header.rect.x,
                x_end: header.rect.x + header.rect.width,
            })
        })
        .collect()
}

/// Prefers the structured date attribute; falls back to the header text.
pub fn header_date(header: &HeaderCell, reference: NaiveDate) -> Option<NaiveDate> {
    header
        .date
        .as_deref()
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
        .or_else(|| date_from_text(&header.text, reference))
}

/// Reads a `DD/MM`, `DD.MM` or `DD-MM` token (optionally followed by a year)
/// out of header text such as `"Mon 30/12"`.
///
/// Without an explicit year, the year that puts the date closest to
/// `reference` wins, so a December reference resolves `02/01` into January of
/// the following year.
pub fn date_from_text(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    text.split_whitespace().find_map(|token| {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit());
        let parts = token
            .split(['/', '.', '-'])
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;

        match parts[..] {
            [year, month, day] if year > 999 => NaiveDate::from_ymd_opt(year as i32, month, day),
            [day, month, year] if year > 999 => NaiveDate::from_ymd_opt(year as i32, month, day),
            [day, month] => closest_year(day, month, reference),
            _ => None,
        }
    })
}

fn closest_year(day: u32, month: u32, reference: NaiveDate) -> Option<NaiveDate> {
    use chrono::Datelike;

    let year = reference.year();
    [year - 1, year, year + 1]
        .into_iter()
        .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
        .min_by_key(|date| (*date - reference).num_days().abs())
}

/// The column containing the rectangle's horizontal center, if any.
pub fn column_for<'a>(columns: &'a [Column], rect: &Rect) -> Option<&'a Column> {
    let center = rect.center_x();
    columns.iter().find(|column| column.contains(center))
}

/// Time range, subject and room of a single block, before any offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDetails {
    pub time_range: TimeRange,
    pub subject: String,
    pub room: String,
}

pub fn parse_block(block: &EventBlock) -> Option<BlockDetails> {
    let structured = block
        .time
        .as_deref()
        .zip(block.title.as_deref())
        .filter(|(time, title)| !time.trim().is_empty() && !title.trim().is_empty());

    let (time, title) = match structured {
        Some(pair) => pair,
        None => {
            let mut lines = block.text.lines().map(str::trim).filter(|l| !l.is_empty());
            (lines.next()?, lines.next()?)
        }
    };

    let time_range = TimeRange::parse(time)?;
    let (subject, room) = split_title(title);
    if subject.is_empty() {
        return None;
    }

    Some(BlockDetails {
        time_range,
        subject,
        room,
    })
}

/// Splits `"<subject> / Aula:<room>"` on the slash in front of the room label,
/// so rooms like `1/2` stay whole. Unlabelled titles split on the last slash;
/// text without a separator is all subject.
pub fn split_title(title: &str) -> (String, String) {
    let lower = title.to_ascii_lowercase();
    let labelled = ROOM_LABELS
        .iter()
        .filter_map(|label| lower.find(label).map(|at| (at, label.len())))
        .min()
        .and_then(|(at, len)| {
            let slash = title[..at].rfind('/')?;
            Some((&title[..slash], &title[at + len..]))
        });

    if let Some((subject, room)) = labelled {
        return (subject.trim().to_string(), room.trim().to_string());
    }

    match title.rsplit_once('/') {
        Some((subject, room)) => (subject.trim().to_string(), room.trim().to_string()),
        None => (title.trim().to_string(), String::new()),
    }
}

/// Turns one block into a dated class, applying the fixed hour offset.
pub fn extract_block(
    columns: &[Column],
    block: &EventBlock,
    hour_offset: i64,
) -> Result<ClassEvent, Skipped> {
    let column = column_for(columns, &block.rect).ok_or(Skipped::NoColumn)?;
    let details = parse_block(block).ok_or(Skipped::Unparseable)?;

    Ok(ClassEvent {
        subject: details.subject,
        room: details.room,
        date: column.date,
        time_range: details.time_range.shifted(hour_offset),
        all_day: false,
    })
}

/// All classes of one week; blocks that cannot be placed or read are dropped.
pub fn extract_week(snapshot: &WeekSnapshot, reference: NaiveDate, hour_offset: i64) -> Vec<ClassEvent> {
    let columns = columns(&snapshot.headers, reference);
    snapshot
        .blocks
        .iter()
        .filter_map(|block| extract_block(&columns, block, hour_offset).ok())
        .collect()
}
