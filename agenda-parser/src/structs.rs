use chrono::{NaiveDate, NaiveTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::TimeRange;

/// Client-rendered bounding rectangle of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// A day header of the week view.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    /// Machine readable date attribute (`YYYY-MM-DD`), when the widget exposes one.
    pub date: Option<String>,
    pub text: String,
    pub rect: Rect,
}

/// A rendered event block of the week view.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBlock {
    pub rect: Rect,
    pub time: Option<String>,
    pub title: Option<String>,
    /// Full rendered text of the block, one visual line per line.
    pub text: String,
}

/// Everything read from the widget for a single visible week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekSnapshot {
    pub headers: Vec<HeaderCell>,
    pub blocks: Vec<EventBlock>,
}

/// Horizontal extent of one day column, `[x_start, x_end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub date: NaiveDate,
    pub x_start: f64,
    pub x_end: f64,
}

impl Column {
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        self.x_start <= x && x < self.x_end
    }
}

/// A university class recovered from the calendar widget.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ClassEvent {
    pub subject: String,
    pub room: String,
    pub date: NaiveDate,
    pub time_range: TimeRange,
    /// Always false for scraped classes, kept for the cache file format.
    #[cfg_attr(feature = "serde", serde(default))]
    pub all_day: bool,
}

/// A home fixture of the tracked club.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Fixture {
    pub title: String,
    pub opponent_venue: String,
    pub date: NaiveDate,
    #[cfg_attr(
        feature = "serde",
        serde(
            default,
            with = "crate::time::hhmm::option",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub time: Option<NaiveTime>,
    pub all_day: bool,
}
