use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};
use crate::models::event::{Event, EventStatus};

const TS_FMT: &str = "%Y%m%dT%H%M%S";
const DATE_FMT: &str = "%Y%m%d";

pub struct CalendarService;

impl CalendarService {
    // Parses the raw CalDAV text into events intersecting [range_start,
    // range_end), ordered by start time. Naive timestamps are interpreted
    // in `local_tz` and normalized to UTC.
    pub fn parse_events(
        raw: &str,
        local_tz: Tz,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = Vec::new();
        let mut current: Option<EventBuilder> = None;

        for line in unfold_lines(raw) {
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            match (field, value) {
                ("BEGIN", "VEVENT") => {
                    current = Some(EventBuilder::default());
                }
                ("END", "VEVENT") => {
                    if let Some(builder) = current.take() {
                        events.push(builder.build()?);
                    }
                }
                _ => {
                    if let Some(builder) = current.as_mut() {
                        builder.set_field(field, value, local_tz)?;
                    }
                }
            }
        }

        events.retain(|event| event.overlaps(range_start, range_end));
        events.sort_by_key(|event| event.start);
        Ok(events)
    }
}

// Continuation lines (leading space or tab) belong to the previous
// content line per RFC 5545 folding.
fn unfold_lines(raw: &str) -> Vec<String> {
    let mut unfolded: Vec<String> = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim_end_matches('\r');
        if let Some(rest) = trimmed.strip_prefix(' ').or_else(|| trimmed.strip_prefix('\t')) {
            if let Some(previous) = unfolded.last_mut() {
                previous.push_str(rest);
                continue;
            }
        }
        unfolded.push(trimmed.to_string());
    }
    unfolded
}

#[derive(Default)]
struct EventBuilder {
    uid: Option<String>,
    summary: Option<String>,
    location: Option<String>,
    categories: Vec<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    transparent: bool,
    tentative: bool,
}

impl EventBuilder {
    fn set_field(&mut self, field: &str, value: &str, local_tz: Tz) -> Result<()> {
        let (name, params) = match field.split_once(';') {
            Some((name, params)) => (name, Some(params)),
            None => (field, None),
        };
        match name {
            "UID" => self.uid = Some(value.to_string()),
            "SUMMARY" => self.summary = Some(value.to_string()),
            "LOCATION" => self.location = Some(value.to_string()),
            "CATEGORIES" => {
                self.categories = value
                    .split_whitespace()
                    .map(|c| c.to_string())
                    .collect();
            }
            "TRANSP" => self.transparent = value == "TRANSPARENT",
            "STATUS" => self.tentative = value == "TENTATIVE",
            "DTSTART" => self.start = Some(parse_timestamp(value, params, local_tz)?),
            "DTEND" => self.end = Some(parse_timestamp(value, params, local_tz)?),
            // RRULE and everything else is ignored: no recurrence expansion.
            _ => {}
        }
        Ok(())
    }

    fn build(self) -> Result<Event> {
        let start = self
            .start
            .ok_or_else(|| Error::Parse("event is missing DTSTART".to_string()))?;
        let end = self
            .end
            .ok_or_else(|| Error::Parse("event is missing DTEND".to_string()))?;
        if start >= end {
            return Err(Error::Parse(format!(
                "event start {} is not before end {}",
                start, end
            )));
        }
        let status = if self.transparent {
            EventStatus::Free
        } else if self.tentative {
            EventStatus::Tentative
        } else {
            EventStatus::Busy
        };
        Ok(Event {
            uid: self.uid.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            categories: self.categories,
            start,
            end,
            status,
        })
    }
}

// Handles the three DTSTART/DTEND shapes seen in CalDAV exports: bare
// timestamps (UTC when Z-suffixed, otherwise local), VALUE=DATE all-day
// entries, and TZID-qualified local timestamps.
fn parse_timestamp(value: &str, params: Option<&str>, local_tz: Tz) -> Result<DateTime<Utc>> {
    if let Some(params) = params {
        for param in params.split(';') {
            if param == "VALUE=DATE" {
                let date = NaiveDate::parse_from_str(value, DATE_FMT)
                    .map_err(|e| Error::Parse(format!("bad all-day date \"{}\": {}", value, e)))?;
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| Error::Parse(format!("bad all-day date \"{}\"", value)))?;
                return to_utc(midnight, local_tz);
            }
            if let Some(tz_name) = param.strip_prefix("TZID=") {
                let tz: Tz = tz_name
                    .parse()
                    .map_err(|_| Error::Parse(format!("unknown timezone \"{}\"", tz_name)))?;
                let local = parse_naive(value)?;
                return to_utc(local, tz);
            }
        }
    }
    if let Some(utc_value) = value.strip_suffix('Z') {
        let naive = parse_naive(utc_value)?;
        return Ok(naive.and_utc());
    }
    let local = parse_naive(value)?;
    to_utc(local, local_tz)
}

fn parse_naive(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TS_FMT)
        .map_err(|e| Error::Parse(format!("bad timestamp \"{}\": {}", value, e)))
}

fn to_utc(local: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::Parse(format!("timestamp {} does not exist in {}", local, tz)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wide_range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn parses_utc_event() {
        let raw = "BEGIN:VCALENDAR\r\n\
                   BEGIN:VEVENT\r\n\
                   UID:abc-123\r\n\
                   SUMMARY:Planning\r\n\
                   DTSTART:20170201T120000Z\r\n\
                   DTEND:20170201T140000Z\r\n\
                   END:VEVENT\r\n\
                   END:VCALENDAR\r\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "abc-123");
        assert_eq!(events[0].summary, "Planning");
        assert_eq!(
            events[0].start,
            Utc.with_ymd_and_hms(2017, 2, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(events[0].length(), chrono::Duration::hours(2));
        assert_eq!(events[0].status, EventStatus::Busy);
    }

    #[test]
    fn normalizes_tzid_to_utc() {
        let raw = "BEGIN:VEVENT\n\
                   UID:hk\n\
                   DTSTART;VALUE=DATE-TIME;TZID=Asia/Hong_Kong:20170210T140000\n\
                   DTEND;VALUE=DATE-TIME;TZID=Asia/Hong_Kong:20170210T150000\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        // Hong Kong is UTC+8.
        assert_eq!(
            events[0].start,
            Utc.with_ymd_and_hms(2017, 2, 10, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn all_day_event_starts_at_local_midnight() {
        let raw = "BEGIN:VEVENT\n\
                   UID:allday\n\
                   DTSTART;VALUE=DATE:20170301\n\
                   DTEND;VALUE=DATE:20170302\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let tz: Tz = "Australia/Melbourne".parse().unwrap();
        let events = CalendarService::parse_events(raw, tz, start, end).unwrap();
        // Melbourne is UTC+11 in March (AEDT).
        assert_eq!(
            events[0].start,
            Utc.with_ymd_and_hms(2017, 2, 28, 13, 0, 0).unwrap()
        );
        assert_eq!(events[0].length(), chrono::Duration::days(1));
    }

    #[test]
    fn transparent_event_is_free() {
        let raw = "BEGIN:VEVENT\n\
                   UID:t\n\
                   DTSTART:20170201T120000Z\n\
                   DTEND:20170201T140000Z\n\
                   TRANSP:TRANSPARENT\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        assert_eq!(events[0].status, EventStatus::Free);
    }

    #[test]
    fn tentative_status_is_kept() {
        let raw = "BEGIN:VEVENT\n\
                   UID:t\n\
                   DTSTART:20170201T120000Z\n\
                   DTEND:20170201T140000Z\n\
                   STATUS:TENTATIVE\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        assert_eq!(events[0].status, EventStatus::Tentative);
    }

    #[test]
    fn folded_summary_is_unfolded() {
        let raw = "BEGIN:VEVENT\n\
                   UID:fold\n\
                   SUMMARY:Quarterly\n planning session\n\
                   DTSTART:20170201T120000Z\n\
                   DTEND:20170201T140000Z\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        assert_eq!(events[0].summary, "Quarterlyplanning session");
    }

    #[test]
    fn missing_dtend_is_parse_error() {
        let raw = "BEGIN:VEVENT\n\
                   UID:bad\n\
                   DTSTART:20170201T120000Z\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let err = CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap_err();
        assert!(err.to_string().contains("DTEND"));
    }

    #[test]
    fn start_after_end_is_parse_error() {
        let raw = "BEGIN:VEVENT\n\
                   UID:bad\n\
                   DTSTART:20170201T150000Z\n\
                   DTEND:20170201T120000Z\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        assert!(CalendarService::parse_events(raw, chrono_tz::UTC, start, end).is_err());
    }

    #[test]
    fn events_outside_range_are_dropped() {
        let raw = "BEGIN:VEVENT\n\
                   UID:old\n\
                   DTSTART:20100201T120000Z\n\
                   DTEND:20100201T140000Z\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn rrule_is_ignored() {
        let raw = "BEGIN:VEVENT\n\
                   UID:rec\n\
                   DTSTART:20170201T120000Z\n\
                   DTEND:20170201T140000Z\n\
                   RRULE:FREQ=WEEKLY;COUNT=10\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn categories_are_split() {
        let raw = "BEGIN:VEVENT\n\
                   UID:cat\n\
                   DTSTART:20170201T120000Z\n\
                   DTEND:20170201T140000Z\n\
                   CATEGORIES:Client Internal\n\
                   END:VEVENT\n";
        let (start, end) = wide_range();
        let events =
            CalendarService::parse_events(raw, chrono_tz::UTC, start, end).unwrap();
        assert_eq!(events[0].categories, vec!["Client", "Internal"]);
    }
}
