use std::fmt;

use chrono::{Duration, NaiveTime, Timelike};

/// Parses a 24-hour `HH:MM` (or `H:MM`) time.
pub fn parse_hhmm<S: AsRef<str>>(s: S) -> Option<NaiveTime> {
    let s = s.as_ref().trim();
    let (hours, minutes) = s.split_once(':')?;
    if minutes.len() != 2 || hours.is_empty() || hours.len() > 2 {
        return None;
    }
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

pub fn format_hhmm(time: &NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Start and end of a class, rendered as `HH:MM - HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    #[must_use]
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Accepts `-`, en dash or em dash between the two times, with or without spaces.
    pub fn parse<S: AsRef<str>>(s: S) -> Option<Self> {
        let mut parts = s.as_ref().split(['-', '–', '—']);
        let start = parse_hhmm(parts.next()?)?;
        let end = parse_hhmm(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { start, end })
    }

    /// Moves both ends by a whole number of hours, wrapping around midnight.
    #[must_use]
    pub fn shifted(self, hours: i64) -> Self {
        let Some(delta) = Duration::try_hours(hours) else {
            return self;
        };
        Self {
            start: self.start.overflowing_add_signed(delta).0,
            end: self.end.overflowing_add_signed(delta).0,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", format_hhmm(&self.start), format_hhmm(&self.end))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimeRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimeRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeRange::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid time range `{raw}`, expected HH:MM - HH:MM"))
        })
    }
}

/// `HH:MM` (de)serialization for `NaiveTime` fields.
#[cfg(feature = "serde")]
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hhmm(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:MM")))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => serializer.serialize_some(&super::super::format_hhmm(time)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::super::parse_hhmm(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid time `{raw}`, expected HH:MM"))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_widget_time_ranges() {
        assert_eq!(
            TimeRange::parse("09:00 - 11:00"),
            Some(TimeRange::new(hm(9, 0), hm(11, 0)))
        );
        assert_eq!(
            TimeRange::parse("8:30–10:15"),
            Some(TimeRange::new(hm(8, 30), hm(10, 15)))
        );
        assert_eq!(TimeRange::parse("09:00"), None);
        assert_eq!(TimeRange::parse("nine - ten"), None);
    }

    #[test]
    fn rejects_malformed_clock_times() {
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("12:5"), None);
        assert_eq!(parse_hhmm("123:00"), None);
        assert_eq!(parse_hhmm(" 7:05 "), Some(hm(7, 5)));
    }

    #[test]
    fn offset_applies_to_both_ends_and_wraps() {
        let range = TimeRange::new(hm(8, 0), hm(10, 0)).shifted(1);
        assert_eq!(range, TimeRange::new(hm(9, 0), hm(11, 0)));

        let late = TimeRange::new(hm(23, 30), hm(23, 45)).shifted(1);
        assert_eq!(late, TimeRange::new(hm(0, 30), hm(0, 45)));
    }

    #[test]
    fn displays_in_cache_format() {
        let range = TimeRange::new(hm(9, 5), hm(11, 0));
        assert_eq!(range.to_string(), "09:05 - 11:00");
    }
}
