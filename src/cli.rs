use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use getopts::{Matches, Options};

use study_agenda::model::{Category, Priority};
use study_agenda::scraper::{DEFAULT_HOUR_OFFSET, DEFAULT_WEEKS};

const USAGE: &str = "Usage: agenda [OPTIONS] COMMAND [ARGS]

Commands:
    sync                    Refresh stale class and fixture caches
    day [DATE]              Agenda of one day, with upcoming deadlines on today
    week [DATE]             Agenda of the week (Monday to Sunday) containing DATE
    month [DATE]            Agenda of the month containing DATE
    deadlines               Pending deadline tasks with their urgency
    prune                   Delete completed tasks dated before today
    add-task TITLE DATE     Add a task on DATE (a deadline with --deadline)
    complete ID             Mark a task as completed
    remove ID               Delete a task
    add-entry               Add a schedule entry read as JSON from stdin
    ics FROM TO             Print the agenda of a date range as iCalendar
    serve                   Serve agendas over HTTP

Dates are YYYY-MM-DD and default to today.";

pub enum Command {
    Sync,
    Day(Option<NaiveDate>),
    Week(Option<NaiveDate>),
    Month(Option<NaiveDate>),
    Deadlines,
    Prune,
    AddTask {
        title: String,
        date: NaiveDate,
        deadline: bool,
        priority: Priority,
        category: Category,
    },
    Complete(String),
    Remove(String),
    AddEntry,
    Ics {
        from: NaiveDate,
        to: NaiveDate,
    },
    Serve,
}

pub struct Args {
    pub command: Command,
    pub data_dir: PathBuf,
    pub webdriver: String,
    pub show_browser: bool,
    pub calendar_url: Option<String>,
    pub timetable: Option<PathBuf>,
    pub fixtures_url: Option<String>,
    pub club: Option<String>,
    pub address: SocketAddr,
    pub cache_ttl: Duration,
    pub force: bool,
    pub weeks: usize,
    pub hour_offset: i64,
    pub json: bool,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "d",
        "data-dir",
        "Directory holding caches and stores [Env: AGENDA_DATA_DIR] [Default: ./agenda-data]",
        "PATH",
    );
    opts.optopt(
        "w",
        "webdriver",
        "WebDriver endpoint [Env: AGENDA_WEBDRIVER] [Default: http://localhost:4444]",
        "URL",
    );
    opts.optflag("", "show-browser", "Do not run the browser headless");
    opts.optopt(
        "",
        "calendar-url",
        "Page showing the class calendar widget [Env: AGENDA_CALENDAR_URL]",
        "URL",
    );
    opts.optopt(
        "",
        "timetable",
        "Static weekly timetable to use instead of the calendar widget",
        "PATH",
    );
    opts.optopt(
        "",
        "fixtures-url",
        "Fixture listing of the tracked club [Env: AGENDA_FIXTURES_URL]",
        "URL",
    );
    opts.optopt("", "club", "Club whose home fixtures are tracked [Env: AGENDA_CLUB]", "NAME");
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Env: AGENDA_ADDR] [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "t",
        "cache-ttl",
        "Time-to-live of scraped data [Default: 43200]",
        "SECONDS",
    );
    opts.optflag("f", "force", "Scrape even when the caches are fresh");
    opts.optopt("", "weeks", "Weeks of classes to scrape [Default: 12]", "COUNT");
    opts.optopt(
        "",
        "hour-offset",
        "Hours added to scraped class times [Default: 1]",
        "HOURS",
    );
    opts.optflag("j", "json", "Print JSON instead of text");
    opts.optflag("", "deadline", "add-task: DATE is a deadline rather than a fixed day");
    opts.optopt("p", "priority", "add-task: normal, important or urgent", "PRIORITY");
    opts.optopt(
        "c",
        "category",
        "add-task: study, assignment, exam, reading or other",
        "CATEGORY",
    );
    opts
}

fn fail(message: impl Display) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

/// Option value, else environment variable, else `None`.
fn lookup(matches: &Matches, name: &str, var: &str) -> Option<String> {
    matches
        .opt_str(name)
        .or_else(|| env::var(var).ok().filter(|value| !value.is_empty()))
}

fn value<T: FromStr>(matches: &Matches, name: &str, default: T) -> T
where
    T::Err: Display,
{
    match matches.opt_get_default(name, default) {
        Ok(value) => value,
        Err(err) => fail(format!("Provided value for option '{name}' is invalid: {err}")),
    }
}

fn date(raw: &str) -> NaiveDate {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(err) => fail(format!("Invalid date '{raw}', expected YYYY-MM-DD: {err}")),
    }
}

fn command(matches: &Matches) -> Command {
    let free = &matches.free;
    let arg = |index: usize, what: &str| match free.get(index) {
        Some(value) => value.clone(),
        None => fail(format!("Missing {what}\n\n{USAGE}")),
    };

    let Some(name) = free.first() else {
        fail(USAGE);
    };

    match name.as_str() {
        "sync" => Command::Sync,
        "day" => Command::Day(free.get(1).map(|raw| date(raw))),
        "week" => Command::Week(free.get(1).map(|raw| date(raw))),
        "month" => Command::Month(free.get(1).map(|raw| date(raw))),
        "deadlines" => Command::Deadlines,
        "prune" => Command::Prune,
        "add-task" => Command::AddTask {
            title: arg(1, "task title"),
            date: date(&arg(2, "task date")),
            deadline: matches.opt_present("deadline"),
            priority: value(matches, "priority", Priority::default()),
            category: value(matches, "category", Category::default()),
        },
        "complete" => Command::Complete(arg(1, "task id")),
        "remove" => Command::Remove(arg(1, "task id")),
        "add-entry" => Command::AddEntry,
        "ics" => Command::Ics {
            from: date(&arg(1, "first date")),
            to: date(&arg(2, "last date")),
        },
        "serve" => Command::Serve,
        other => fail(format!("Unknown command '{other}'\n\n{USAGE}")),
    }
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(err) => fail(err),
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(USAGE));
        process::exit(0);
    }

    let address = match lookup(&matches, "address", "AGENDA_ADDR") {
        Some(raw) => match raw.parse::<SocketAddr>() {
            Ok(address) => address,
            Err(err) => fail(format!("Provided value for option 'address' is invalid: {err}")),
        },
        None => SocketAddr::from(([127, 0, 0, 1], 8080)),
    };

    Args {
        command: command(&matches),
        data_dir: lookup(&matches, "data-dir", "AGENDA_DATA_DIR")
            .map_or_else(|| PathBuf::from("agenda-data"), PathBuf::from),
        webdriver: lookup(&matches, "webdriver", "AGENDA_WEBDRIVER")
            .unwrap_or_else(|| "http://localhost:4444".to_string()),
        show_browser: matches.opt_present("show-browser"),
        calendar_url: lookup(&matches, "calendar-url", "AGENDA_CALENDAR_URL"),
        timetable: matches.opt_str("timetable").map(PathBuf::from),
        fixtures_url: lookup(&matches, "fixtures-url", "AGENDA_FIXTURES_URL"),
        club: lookup(&matches, "club", "AGENDA_CLUB"),
        address,
        cache_ttl: Duration::from_secs(value(&matches, "cache-ttl", 12 * 60 * 60)),
        force: matches.opt_present("force"),
        weeks: value(&matches, "weeks", DEFAULT_WEEKS),
        hour_offset: value(&matches, "hour-offset", DEFAULT_HOUR_OFFSET),
        json: matches.opt_present("json"),
    }
}
