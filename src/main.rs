mod cli;

use std::collections::BTreeMap;
use std::env;
use std::io;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};

use study_agenda::agenda::{agenda_range, day_agenda, upcoming_deadlines, DayAgenda, Reminder};
use study_agenda::browser::WebDriverConnector;
use study_agenda::cache;
use study_agenda::deadline::prune_store;
use study_agenda::ics::agenda_to_ics;
use study_agenda::model::{Due, Event, ScheduleEntry, Task, TaskStatus};
use study_agenda::scraper::{ClassScraper, FixtureScraper};
use study_agenda::server;
use study_agenda::store::RecordStore;
use study_agenda::sync::{synchronize, ClassOrigin, Plan, DEFAULT_TIMEOUT};
use study_agenda::timetable::StaticTimetable;
use study_agenda::utils::{month_of, week_of};
use study_agenda::workspace::Workspace;

use cli::{Args, Command};

fn setup_logging() {
    if env::var("LOG").is_err() {
        env::set_var("LOG", "study_agenda=info,agenda=info");
    }

    pretty_env_logger::init_custom_env("LOG");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup_logging();

    let args = cli::parse(env::args().skip(1).collect());
    let workspace = Workspace::new(&args.data_dir);
    let today = Local::now().date_naive();

    match &args.command {
        Command::Sync => sync(&args, &workspace, today).await,

        Command::Day(date) => {
            let snapshot = workspace.snapshot();
            let agenda = day_agenda(date.unwrap_or(today), today, &snapshot.sources());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&agenda)?);
            } else {
                print_day(&agenda);
            }
            Ok(())
        }

        Command::Week(date) => print_range(&args, &workspace, week_of(date.unwrap_or(today))),

        Command::Month(date) => print_range(&args, &workspace, month_of(date.unwrap_or(today))),

        Command::Deadlines => {
            let tasks = workspace.tasks().read_all()?;
            let reminders = upcoming_deadlines(today, today, &tasks);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&reminders)?);
            } else if reminders.is_empty() {
                println!("No pending deadlines");
            } else {
                reminders.iter().for_each(print_reminder);
            }
            Ok(())
        }

        Command::Prune => {
            let removed = prune_store(&mut workspace.tasks(), today)?;
            println!("Pruned {removed} completed tasks");
            Ok(())
        }

        Command::AddTask {
            title,
            date,
            deadline,
            priority,
            category,
        } => {
            let due = if *deadline {
                Due::Deadline((*date).into())
            } else {
                Due::Target((*date).into())
            };

            let mut task = Task::new(format!("task-{}", Local::now().timestamp_millis()), title.clone(), due);
            task.priority = *priority;
            task.category = *category;

            workspace.tasks().create(task.clone())?;
            println!("Added task {}", task.id);
            Ok(())
        }

        Command::Complete(id) => {
            let mut store = workspace.tasks();
            let Some(mut task) = store.read_all()?.into_iter().find(|task| &task.id == id) else {
                bail!("No task with id `{id}`");
            };
            task.status = TaskStatus::Completed;
            store.update_by_id(task)?;
            println!("Completed task {id}");
            Ok(())
        }

        Command::Remove(id) => {
            if !workspace.tasks().delete_by_id(id)? {
                bail!("No task with id `{id}`");
            }
            println!("Removed task {id}");
            Ok(())
        }

        Command::AddEntry => {
            let raw = io::read_to_string(io::stdin()).context("Failed to read entry from stdin")?;
            let entry: ScheduleEntry = serde_json::from_str(&raw).context("Invalid schedule entry")?;
            entry.occurs_on(today)?;

            let id = entry.id.clone();
            workspace.entries().create(entry)?;
            println!("Added entry {id}");
            Ok(())
        }

        Command::Ics { from, to } => {
            if to < from {
                bail!("{to} is before {from}");
            }
            let snapshot = workspace.snapshot();
            let agendas = agenda_range(*from, *to, &snapshot.sources());
            print!("{}", agenda_to_ics(env!("CARGO_PKG_NAME"), &agendas));
            Ok(())
        }

        Command::Serve => Ok(server::serve(args.address, workspace).await?),
    }
}

async fn sync(args: &Args, workspace: &Workspace, today: NaiveDate) -> Result<()> {
    let timetable = args
        .timetable
        .as_deref()
        .map(StaticTimetable::load)
        .transpose()
        .context("Failed to load timetable")?;

    let class_scraper = args.calendar_url.as_ref().map(|url| ClassScraper {
        hour_offset: args.hour_offset,
        ..ClassScraper::new(url.clone())
    });

    let fixture_scraper = match (&args.fixtures_url, &args.club) {
        (Some(url), Some(club)) => Some(FixtureScraper::new(url.clone(), club.clone())),
        (Some(_), None) => {
            log::warn!("A fixture listing needs a club to track, skipping fixtures");
            None
        }
        _ => None,
    };

    let classes = match (&timetable, &class_scraper) {
        (Some(timetable), _) => Some(ClassOrigin::Timetable(timetable)),
        (None, Some(scraper)) => Some(ClassOrigin::Widget(scraper)),
        (None, None) => {
            log::warn!("No calendar URL or timetable given, classes are not refreshed");
            None
        }
    };

    let class_cache = workspace.class_cache();
    let fixture_cache = workspace.fixture_cache();

    let plan = Plan {
        classes,
        fixtures: fixture_scraper.as_ref(),
        class_cache: &class_cache,
        fixture_cache: &fixture_cache,
        cache: cache::Config {
            ttl: args.cache_ttl,
            force: args.force,
        },
        weeks: args.weeks,
        timeout: DEFAULT_TIMEOUT,
    };

    let connector = WebDriverConnector {
        url: args.webdriver.clone(),
        headless: !args.show_browser,
    };

    log::info!("Synchronizing into {}", workspace.root().display());
    let report = synchronize(&connector, &plan, today).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("classes:  {} ({:?})", report.classes.count, report.classes.origin);
        println!("fixtures: {} ({:?})", report.fixtures.count, report.fixtures.origin);
        if report.timed_out {
            println!("timed out, cached data kept");
        }
    }

    Ok(())
}

fn print_range(args: &Args, workspace: &Workspace, (first, last): (NaiveDate, NaiveDate)) -> Result<()> {
    let snapshot = workspace.snapshot();
    let agendas: BTreeMap<NaiveDate, Vec<Event>> = agenda_range(first, last, &snapshot.sources());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&agendas)?);
        return Ok(());
    }

    for (date, events) in &agendas {
        print_events(*date, events);
    }
    Ok(())
}

fn print_day(agenda: &DayAgenda) {
    print_events(agenda.date, &agenda.events);

    if !agenda.upcoming.is_empty() {
        println!("\nUpcoming deadlines");
        agenda.upcoming.iter().for_each(print_reminder);
    }
}

fn print_events(date: NaiveDate, events: &[Event]) {
    println!("{}", date.format("%a %Y-%m-%d"));

    if events.is_empty() {
        println!("  -");
    }

    for event in events {
        let time = time_label(event);

        match event.location() {
            Some(location) => println!("  {time:<13}  {} ({location})", event.title()),
            None => println!("  {time:<13}  {}", event.title()),
        }
    }
}

fn time_label(event: &Event) -> String {
    match (event.start(), event.end()) {
        (Some(start), Some(end)) => format!("{} - {}", start.format("%H:%M"), end.format("%H:%M")),
        (Some(start), None) => start.format("%H:%M").to_string(),
        (None, Some(end)) => format!("until {}", end.format("%H:%M")),
        (None, None) => "all day".to_string(),
    }
}

fn print_reminder(reminder: &Reminder) {
    let marker = if reminder.urgency.urgent { "!" } else { " " };
    println!(
        "  {marker} {}  {}  [{}]",
        reminder.deadline,
        reminder.title,
        reminder.urgency.label
    );
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use study_agenda::model::SourceKind;

    use super::*;

    fn hm(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn only_events_without_times_print_as_all_day() {
        let label = |start, end| time_label(&Event::new("x", SourceKind::ManualEvent, start, end));

        assert_eq!(label(hm(9, 0), hm(10, 30)), "09:00 - 10:30");
        assert_eq!(label(hm(9, 0), None), "09:00");
        assert_eq!(label(None, hm(10, 30)), "until 10:30");
        assert_eq!(label(None, None), "all day");
    }
}
