//! Merges every event source into ordered per-day agendas.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::deadline::{classify, Urgency};
use crate::model::{ClassEvent, Event, Fixture, Priority, ScheduleEntry, Task};
use crate::utils::DayRange;

/// Everything an agenda is computed from. Enumeration order of the slices is
/// the tie-break for events sharing a sort key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sources<'a> {
    pub classes: &'a [ClassEvent],
    pub fixtures: &'a [Fixture],
    pub entries: &'a [ScheduleEntry],
    pub tasks: &'a [Task],
}

/// The agenda of a single day, ordered by start time with all-day items first.
pub fn agenda_for(date: NaiveDate, sources: &Sources) -> Vec<Event> {
    let mut events = Vec::new();

    events.extend(
        sources
            .classes
            .iter()
            .filter(|class| class.date == date)
            .map(Event::from),
    );

    events.extend(
        sources
            .fixtures
            .iter()
            .filter(|fixture| fixture.date == date)
            .map(Event::from),
    );

    for entry in sources.entries {
        match entry.occurs_on(date) {
            Ok(true) => events.push(Event::from(entry)),
            Ok(false) => {}
            Err(err) => log::debug!("Leaving entry out of {date}: {err}"),
        }
    }

    // Completed fixed-date tasks stay on their own day and are never carried forward.
    for task in sources.tasks {
        match task.due_on() {
            Ok(day) if day == date => events.push(Event::from(task)),
            Ok(_) => {}
            Err(err) => log::debug!("Leaving task out of {date}: {err}"),
        }
    }

    events.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
    events
}

/// One agenda per day from `first` to `last` inclusive. Days without events
/// are present with an empty list.
pub fn agenda_range(first: NaiveDate, last: NaiveDate, sources: &Sources) -> BTreeMap<NaiveDate, Vec<Event>> {
    DayRange::new(first, last)
        .map(|date| (date, agenda_for(date, sources)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub task_id: String,
    pub title: String,
    pub deadline: NaiveDate,
    pub priority: Priority,
    pub urgency: Urgency,
}

/// Rolling list of pending deadlines, earliest first.
///
/// Only produced when `date` is `today`: deadlines are not repeated on every
/// day leading up to them.
pub fn upcoming_deadlines(date: NaiveDate, today: NaiveDate, tasks: &[Task]) -> Vec<Reminder> {
    if date != today {
        return Vec::new();
    }

    let mut reminders = tasks
        .iter()
        .filter(|task| !task.is_completed())
        .filter_map(|task| {
            Some(Reminder {
                task_id: task.id.clone(),
                title: task.title.clone(),
                deadline: task.deadline()?,
                priority: task.priority,
                urgency: classify(task, today)?,
            })
        })
        .collect::<Vec<_>>();

    reminders.sort_by_key(|reminder| reminder.deadline);
    reminders
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAgenda {
    pub date: NaiveDate,
    pub events: Vec<Event>,
    pub upcoming: Vec<Reminder>,
}

pub fn day_agenda(date: NaiveDate, today: NaiveDate, sources: &Sources) -> DayAgenda {
    DayAgenda {
        date,
        events: agenda_for(date, sources),
        upcoming: upcoming_deadlines(date, today, sources.tasks),
    }
}
