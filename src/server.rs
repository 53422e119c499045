use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::agenda::agenda_range;
use crate::ics::agenda_to_ics;
use crate::utils::week_of;
use crate::workspace::Workspace;

const AGENDA_PATH: &str = "/agenda";

/// Longest range served in one request.
const MAX_DAYS: i64 = 366;

pub fn router(workspace: Arc<Workspace>) -> Router {
    Router::new()
        .route(AGENDA_PATH, get(handle_agenda))
        .fallback(|| async { Redirect::permanent(env!("CARGO_PKG_REPOSITORY")) })
        .with_state(workspace)
}

pub async fn serve(addr: SocketAddr, workspace: Workspace) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening at http://{addr}{AGENDA_PATH}");

    axum::serve(listener, router(Arc::new(workspace)))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {err}");
            }
        })
        .await
}

#[derive(Deserialize)]
struct AgendaQuery {
    from: Option<String>,
    to: Option<String>,
    #[serde(default)]
    json: bool,
}

fn parse_date(raw: Option<&str>, default: NaiveDate) -> Option<NaiveDate> {
    match raw {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok(),
        None => Some(default),
    }
}

async fn handle_agenda(State(workspace): State<Arc<Workspace>>, Query(query): Query<AgendaQuery>) -> Response {
    let (monday, sunday) = week_of(Local::now().date_naive());

    let (Some(from), Some(to)) = (
        parse_date(query.from.as_deref(), monday),
        parse_date(query.to.as_deref(), sunday),
    ) else {
        return (StatusCode::BAD_REQUEST, "Dates must be YYYY-MM-DD\n").into_response();
    };

    if to < from || (to - from).num_days() >= MAX_DAYS {
        return (StatusCode::BAD_REQUEST, "Invalid date range\n").into_response();
    }

    let snapshot = workspace.snapshot();
    let agendas = agenda_range(from, to, &snapshot.sources());

    if query.json {
        return Json(agendas).into_response();
    }

    (
        [("content-type", "text/calendar")],
        agenda_to_ics(env!("CARGO_PKG_NAME"), &agendas).to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_dates_fall_back_to_the_default() {
        let default = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(parse_date(None, default), Some(default));
        assert_eq!(parse_date(Some("2025-03-10"), default), NaiveDate::from_ymd_opt(2025, 3, 10));
        assert_eq!(parse_date(Some("10/03/2025"), default), None);
    }
}
