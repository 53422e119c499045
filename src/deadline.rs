use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::model::Task;
use crate::store::RecordStore;

/// Deadlines closer than this many days are urgent.
const URGENT_WITHIN_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "label", content = "days")]
pub enum DueLabel {
    Overdue,
    DueToday,
    DueInDays(i64),
}

impl fmt::Display for DueLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueLabel::Overdue => f.write_str("overdue"),
            DueLabel::DueToday => f.write_str("due today"),
            DueLabel::DueInDays(1) => f.write_str("due tomorrow"),
            DueLabel::DueInDays(days) => write!(f, "due in {days} days"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Urgency {
    pub urgent: bool,
    pub label: DueLabel,
}

/// Urgency of a deadline task. `None` for fixed-date tasks and for
/// deadlines that cannot be read.
pub fn classify(task: &Task, today: NaiveDate) -> Option<Urgency> {
    let remaining = (task.deadline()? - today).num_days();

    let label = match remaining {
        days if days < 0 => DueLabel::Overdue,
        0 => DueLabel::DueToday,
        days => DueLabel::DueInDays(days),
    };

    Some(Urgency {
        urgent: (0..URGENT_WITHIN_DAYS).contains(&remaining),
        label,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pruned {
    pub kept: Vec<Task>,
    pub removed: Vec<Task>,
}

/// Drops completed tasks whose reference date lies before `today`.
/// Tasks whose date cannot be read are kept.
pub fn prune(tasks: Vec<Task>, today: NaiveDate) -> Pruned {
    let (removed, kept): (Vec<Task>, Vec<Task>) = tasks.into_iter().partition(|task| {
        task.is_completed() && task.reference_date().is_some_and(|date| date < today)
    });
    Pruned { kept, removed }
}

/// Prunes the store in place, writing only when something was removed.
/// Returns the number of removed tasks.
pub fn prune_store<S: RecordStore<Task> + ?Sized>(store: &mut S, today: NaiveDate) -> Result<usize> {
    let Pruned { kept, removed } = prune(store.read_all()?, today);
    if removed.is_empty() {
        return Ok(0);
    }

    for task in &removed {
        log::info!("Pruning completed task `{}` ({})", task.title, task.id);
    }
    store.replace_all(kept)?;
    Ok(removed.len())
}
