//! Event sources and the common [`Event`] shape they normalize into.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use agenda_parser::time::hhmm;
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use agenda_parser::{ClassEvent, Fixture};

pub const ALL_DAY_SORT_KEY: &str = "0000";
pub const CLASS_COLOR: &str = "blue";
pub const FIXTURE_COLOR: &str = "purple";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    UniversityClass,
    SportsFixture,
    ManualRoutine,
    ManualEvent,
    ManualMultiDayEvent,
    TaskDate,
    TaskDeadline,
}

/// One item of a day's agenda.
///
/// Built only through [`Event::new`], so `all_day` is true exactly when
/// neither time is known and `sort_key` is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    title: String,
    location: Option<String>,
    description: Option<String>,
    #[serde(rename = "startTime", with = "hhmm::option")]
    start: Option<NaiveTime>,
    #[serde(rename = "endTime", with = "hhmm::option")]
    end: Option<NaiveTime>,
    all_day: bool,
    source_kind: SourceKind,
    #[serde(rename = "colorHint")]
    color: Option<String>,
    sort_key: String,
}

impl Event {
    pub fn new<S: Into<String>>(
        title: S,
        source_kind: SourceKind,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> Self {
        let sort_key = start
            .or(end)
            .map_or_else(|| ALL_DAY_SORT_KEY.to_string(), |time| time.format("%H%M").to_string());

        Self {
            title: title.into(),
            location: None,
            description: None,
            start,
            end,
            all_day: start.is_none() && end.is_none(),
            source_kind,
            color: None,
            sort_key,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<&str>) -> Self {
        self.location = non_empty(location);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = non_empty(description);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Option<&str>) -> Self {
        self.color = non_empty(color);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn start(&self) -> Option<NaiveTime> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveTime> {
        self.end
    }

    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl From<&ClassEvent> for Event {
    fn from(class: &ClassEvent) -> Self {
        Event::new(
            &class.subject,
            SourceKind::UniversityClass,
            Some(class.time_range.start),
            Some(class.time_range.end),
        )
        .with_location(Some(class.room.as_str()))
        .with_color(Some(CLASS_COLOR))
    }
}

impl From<&Fixture> for Event {
    fn from(fixture: &Fixture) -> Self {
        let start = if fixture.all_day { None } else { fixture.time };
        Event::new(&fixture.title, SourceKind::SportsFixture, start, None)
            .with_description(Some(fixture.opponent_venue.as_str()))
            .with_color(Some(FIXTURE_COLOR))
    }
}

/// A date as found in a store. Values that are not `YYYY-MM-DD` are kept
/// verbatim so they survive a rewrite of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredDate {
    Date(NaiveDate),
    Raw(String),
}

impl StoredDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            StoredDate::Date(date) => Some(*date),
            StoredDate::Raw(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok(),
        }
    }

    fn resolve(&self, id: &str) -> Result<NaiveDate> {
        self.date().ok_or_else(|| Error::MembershipData {
            id: id.to_string(),
            reason: format!("`{self}` is not a YYYY-MM-DD date"),
        })
    }
}

impl From<NaiveDate> for StoredDate {
    fn from(date: NaiveDate) -> Self {
        StoredDate::Date(date)
    }
}

impl fmt::Display for StoredDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredDate::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            StoredDate::Raw(raw) => f.write_str(raw),
        }
    }
}

/// `0` for Monday through `6` for Sunday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// A manually defined routine or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub shape: EntryShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EntryShape {
    SingleDate {
        date: StoredDate,
        #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
        start: Option<NaiveTime>,
        #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
        end: Option<NaiveTime>,
        #[serde(default)]
        all_day: bool,
    },
    WeeklyRoutine {
        weekdays: BTreeSet<u8>,
        #[serde(with = "hhmm")]
        start: NaiveTime,
        #[serde(with = "hhmm")]
        end: NaiveTime,
    },
    DateRange {
        start_date: StoredDate,
        end_date: StoredDate,
        #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
        start: Option<NaiveTime>,
        #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
        end: Option<NaiveTime>,
        #[serde(default)]
        all_day: bool,
    },
}

impl ScheduleEntry {
    pub fn single_date<S: Into<String>>(
        id: S,
        title: S,
        date: NaiveDate,
        times: Option<(NaiveTime, NaiveTime)>,
    ) -> Self {
        Self::with_shape(
            id,
            title,
            EntryShape::SingleDate {
                date: date.into(),
                start: times.map(|(start, _)| start),
                end: times.map(|(_, end)| end),
                all_day: times.is_none(),
            },
        )
    }

    pub fn weekly_routine<S: Into<String>>(
        id: S,
        title: S,
        weekdays: impl IntoIterator<Item = u8>,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        Self::with_shape(
            id,
            title,
            EntryShape::WeeklyRoutine {
                weekdays: weekdays.into_iter().filter(|day| *day <= 6).collect(),
                start,
                end,
            },
        )
    }

    /// Fails when `end_date` precedes `start_date`.
    pub fn date_range<S: Into<String>>(
        id: S,
        title: S,
        start_date: NaiveDate,
        end_date: NaiveDate,
        times: Option<(NaiveTime, NaiveTime)>,
    ) -> Result<Self> {
        let id = id.into();
        if end_date < start_date {
            return Err(Error::MembershipData {
                id,
                reason: format!("range ends ({end_date}) before it starts ({start_date})"),
            });
        }

        Ok(Self::with_shape(
            id,
            title.into(),
            EntryShape::DateRange {
                start_date: start_date.into(),
                end_date: end_date.into(),
                start: times.map(|(start, _)| start),
                end: times.map(|(_, end)| end),
                all_day: times.is_none(),
            },
        ))
    }

    fn with_shape<S: Into<String>>(id: S, title: S, shape: EntryShape) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            location: None,
            description: None,
            color: None,
            shape,
        }
    }

    /// Whether the entry takes place on `date`. Errors when a stored date is
    /// unusable, in which case the entry is left out of the query.
    pub fn occurs_on(&self, date: NaiveDate) -> Result<bool> {
        match &self.shape {
            EntryShape::SingleDate { date: on, .. } => Ok(on.resolve(&self.id)? == date),
            EntryShape::WeeklyRoutine { weekdays, .. } => Ok(weekdays.contains(&weekday_index(date))),
            EntryShape::DateRange {
                start_date,
                end_date,
                ..
            } => {
                let first = start_date.resolve(&self.id)?;
                let last = end_date.resolve(&self.id)?;
                if last < first {
                    return Err(Error::MembershipData {
                        id: self.id.clone(),
                        reason: format!("range ends ({last}) before it starts ({first})"),
                    });
                }
                Ok(first <= date && date <= last)
            }
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self.shape {
            EntryShape::SingleDate { .. } => SourceKind::ManualEvent,
            EntryShape::WeeklyRoutine { .. } => SourceKind::ManualRoutine,
            EntryShape::DateRange { .. } => SourceKind::ManualMultiDayEvent,
        }
    }

    fn times(&self) -> (Option<NaiveTime>, Option<NaiveTime>) {
        match self.shape {
            EntryShape::WeeklyRoutine { start, end, .. } => (Some(start), Some(end)),
            EntryShape::SingleDate { all_day: true, .. } | EntryShape::DateRange { all_day: true, .. } => {
                (None, None)
            }
            EntryShape::SingleDate { start, end, .. } | EntryShape::DateRange { start, end, .. } => {
                (start, end)
            }
        }
    }
}

impl From<&ScheduleEntry> for Event {
    fn from(entry: &ScheduleEntry) -> Self {
        let (start, end) = entry.times();
        Event::new(&entry.title, entry.source_kind(), start, end)
            .with_location(entry.location.as_deref())
            .with_description(entry.description.as_deref())
            .with_color(entry.color.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[default]
    Normal,
    Important,
    Urgent,
}

impl Priority {
    pub fn color(self) -> &'static str {
        match self {
            Priority::Normal => "green",
            Priority::Important => "orange",
            Priority::Urgent => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Study,
    Assignment,
    Exam,
    Reading,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

macro_rules! name_table {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self { $(Self::$variant => $name),+ })
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case($name) { return Ok(Self::$variant); })+
                Err(format!("unknown {} `{s}`", stringify!($ty).to_lowercase()))
            }
        }
    };
}

name_table!(Priority { Normal => "normal", Important => "important", Urgent => "urgent" });
name_table!(Category {
    Study => "study",
    Assignment => "assignment",
    Exam => "exam",
    Reading => "reading",
    Other => "other",
});
name_table!(TaskStatus { Pending => "pending", Completed => "completed" });

/// When a task is due: on a fixed day, or by a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Due {
    #[serde(rename = "targetDate")]
    Target(StoredDate),
    #[serde(rename = "deadlineDate")]
    Deadline(StoredDate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(flatten)]
    pub due: Due,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<NaiveTime>,
}

impl Task {
    pub fn new<S: Into<String>>(id: S, title: S, due: Due) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            priority: Priority::default(),
            category: Category::default(),
            status: TaskStatus::default(),
            due,
            all_day: true,
            time_of_day: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn deadline(&self) -> Option<NaiveDate> {
        match &self.due {
            Due::Deadline(date) => date.date(),
            Due::Target(_) => None,
        }
    }

    /// Deadline for deadline tasks, target date otherwise.
    pub fn reference_date(&self) -> Option<NaiveDate> {
        match &self.due {
            Due::Target(date) | Due::Deadline(date) => date.date(),
        }
    }

    pub(crate) fn due_on(&self) -> Result<NaiveDate> {
        match &self.due {
            Due::Target(date) | Due::Deadline(date) => date.resolve(&self.id),
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self.due {
            Due::Target(_) => SourceKind::TaskDate,
            Due::Deadline(_) => SourceKind::TaskDeadline,
        }
    }
}

impl From<&Task> for Event {
    fn from(task: &Task) -> Self {
        let start = if task.all_day { None } else { task.time_of_day };
        let description = format!("{} · {} · {}", task.category, task.priority, task.status);
        Event::new(&task.title, task.source_kind(), start, None)
            .with_description(Some(description.as_str()))
            .with_color(Some(task.priority.color()))
    }
}
