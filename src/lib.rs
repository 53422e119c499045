//! Keeps a student's agenda in sync: university classes read off a rendered
//! calendar widget, home fixtures of a sports club, manual schedule entries
//! and tasks, merged into ordered per-day agendas.

pub mod agenda;
pub mod browser;
pub mod cache;
pub mod deadline;
pub mod error;
pub mod ics;
pub mod model;
pub mod scraper;
pub mod server;
pub mod store;
pub mod sync;
pub mod timetable;
pub mod utils;
pub mod workspace;

pub use error::{Error, Result};
