use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use agenda_parser::{ClassEvent, TimeRange};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::Deserialize;

use crate::error::Result;
use crate::model::weekday_index;
use crate::scraper::CalendarSource;
use crate::utils::{week_of, DayRange};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub time_range: TimeRange,
    pub subject: String,
    #[serde(default)]
    pub room: String,
}

/// A fixed weekly timetable keyed by weekday (`0` = Monday), e.g.
///
/// ```json
/// { "0": [{ "timeRange": "09:00 - 11:00", "subject": "Algebra", "room": "1.2" }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct StaticTimetable {
    days: BTreeMap<u8, Vec<Slot>>,
}

impl StaticTimetable {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Classes from the Monday of `today`'s week through `weeks` whole weeks.
    pub fn expand(&self, weeks: usize, today: NaiveDate) -> Vec<ClassEvent> {
        let (monday, _) = week_of(today);
        let Some(last) = (weeks as u64)
            .checked_mul(7)
            .and_then(|days| monday.checked_add_days(Days::new(days)))
            .and_then(|end| end.pred_opt())
        else {
            return Vec::new();
        };

        DayRange::new(monday, last)
            .flat_map(|date| {
                self.days
                    .get(&weekday_index(date))
                    .into_iter()
                    .flatten()
                    .map(move |slot| ClassEvent {
                        subject: slot.subject.clone(),
                        room: slot.room.clone(),
                        date,
                        time_range: slot.time_range,
                        all_day: false,
                    })
            })
            .collect()
    }
}

#[async_trait]
impl CalendarSource for StaticTimetable {
    async fn class_events(&mut self, weeks: usize, today: NaiveDate) -> Vec<ClassEvent> {
        self.expand(weeks, today)
    }
}
