//! Extraction of class schedules and fixtures from rendered calendar pages.
//!
//! Nothing in here performs I/O: callers hand in what a browser session read
//! (header rectangles, event blocks, page source) and get typed records back.

macro_rules! selector {
    ($query:expr) => {{
        static SELECTOR: once_cell::sync::Lazy<scraper::Selector> =
            once_cell::sync::Lazy::new(|| scraper::Selector::parse($query).unwrap());
        &SELECTOR
    }};
}

mod fixtures;
pub mod geometry;
mod structs;
pub mod time;

pub use fixtures::{parse_fixtures, parse_row};
pub use geometry::{extract_week, Skipped};
pub use structs::{ClassEvent, Column, EventBlock, Fixture, HeaderCell, Rect, WeekSnapshot};
pub use time::TimeRange;
