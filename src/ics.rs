use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use ics::components::Parameter;
use ics::properties::{Description, DtEnd, DtStart, Location, RRule, Summary, TzName};
use ics::{Daylight, ICalendar, Standard, TimeZone};

use crate::model::Event;

const TZID: &str = "Europe/Madrid";

/// An empty calendar carrying the CET/CEST timezone all local times refer to.
pub fn ics_base<'a, S: Into<Cow<'a, str>>>(name: S) -> ICalendar<'a> {
    let mut cet_standard = Standard::new("19701025T030000", "+0200", "+0100");
    cet_standard.push(TzName::new("CET"));
    cet_standard.push(RRule::new("FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU"));

    let mut cest_daylight = Daylight::new("19700329T020000", "+0100", "+0200");
    cest_daylight.push(TzName::new("CEST"));
    cest_daylight.push(RRule::new("FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU"));

    let mut timezone = TimeZone::daylight(TZID, cest_daylight);
    timezone.add_standard(cet_standard);

    let mut icalendar = ICalendar::new("2.0", name);
    icalendar.add_timezone(timezone);
    icalendar
}

fn local(date: NaiveDate, time: NaiveTime) -> String {
    format!("{}T{}00", date.format("%Y%m%d"), time.format("%H%M"))
}

/// `event` as it occurs on `date`. Timed events ending before they start
/// run past midnight.
pub fn to_ics_event<'a>(date: NaiveDate, event: &Event) -> ics::Event<'a> {
    let stamp = local(date, event.start().unwrap_or(NaiveTime::MIN));
    let uid = format!(
        "{}_{}_{:?}_{}",
        date.format("%Y%m%d"),
        event.sort_key(),
        event.source_kind(),
        event.title().replace(' ', "-")
    );

    let mut ics_event = ics::Event::new(uid, stamp);

    match (event.start(), event.end()) {
        (Some(start), end) => {
            let mut dtstart = DtStart::new(local(date, start));
            dtstart.add(Parameter::new("TZID", TZID));
            ics_event.push(dtstart);

            if let Some(end) = end {
                let end_date = if end < start { date.succ_opt().unwrap_or(date) } else { date };
                let mut dtend = DtEnd::new(local(end_date, end));
                dtend.add(Parameter::new("TZID", TZID));
                ics_event.push(dtend);
            }
        }
        (None, _) => {
            let mut dtstart = DtStart::new(date.format("%Y%m%d").to_string());
            dtstart.add(Parameter::new("VALUE", "DATE"));
            ics_event.push(dtstart);

            let next = date.succ_opt().unwrap_or(date);
            let mut dtend = DtEnd::new(next.format("%Y%m%d").to_string());
            dtend.add(Parameter::new("VALUE", "DATE"));
            ics_event.push(dtend);
        }
    }

    ics_event.push(Summary::new(event.title().to_string()));

    if let Some(location) = event.location() {
        ics_event.push(Location::new(location.to_string()));
    }

    if let Some(description) = event.description() {
        ics_event.push(Description::new(description.to_string()));
    }

    ics_event
}

pub fn agenda_to_ics<'a, S: Into<Cow<'a, str>>>(
    name: S,
    agendas: &BTreeMap<NaiveDate, Vec<Event>>,
) -> ICalendar<'a> {
    let mut icalendar = ics_base(name);

    for (date, events) in agendas {
        for event in events {
            icalendar.add_event(to_ics_event(*date, event));
        }
    }

    icalendar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceKind;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn timed_and_all_day_events() {
        let day = date("2025-03-03");
        let mut agendas = BTreeMap::new();
        agendas.insert(
            day,
            vec![
                Event::new("Exams week", SourceKind::ManualMultiDayEvent, None, None),
                Event::new("Bases de Datos", SourceKind::UniversityClass, Some(hm(11, 30)), Some(hm(13, 30)))
                    .with_location(Some("2.1")),
            ],
        );

        let ics = agenda_to_ics("agenda", &agendas).to_string();

        assert!(ics.contains("TZID:Europe/Madrid"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20250303"));
        assert!(ics.contains("DTEND;VALUE=DATE:20250304"));
        assert!(ics.contains("DTSTART;TZID=Europe/Madrid:20250303T113000"));
        assert!(ics.contains("DTEND;TZID=Europe/Madrid:20250303T133000"));
        assert!(ics.contains("LOCATION:2.1"));
        assert!(ics.contains("SUMMARY:Bases de Datos"));
    }

    #[test]
    fn events_past_midnight_end_the_next_day() {
        let event = Event::new("Late shift", SourceKind::ManualEvent, Some(hm(23, 0)), Some(hm(0, 30)));
        let ics = to_ics_event(date("2025-03-03"), &event).to_string();
        assert!(ics.contains("DTEND;TZID=Europe/Madrid:20250304T003000"));
    }
}
