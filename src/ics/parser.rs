//! RFC 5545 calendar parsing.
//!
//! A small subset of the grammar: unfold continuation lines, walk
//! BEGIN:VEVENT/END:VEVENT blocks, and pull out the properties the importer
//! stores. Recurrence expansion and VTIMEZONE tables are out of scope;
//! floating times collapse to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

/// Errors produced while parsing calendar content
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IcsParseError {
    /// Content has no BEGIN:VCALENDAR wrapper
    #[error("no calendar found in content")]
    NoCalendar,
}

/// One VEVENT block reduced to the fields the importer stores
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IcsEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub categories: Option<String>,
    pub priority: Option<String>,
}

/// Parses calendar content into its VEVENT blocks.
///
/// Content without a `BEGIN:VCALENDAR` line is rejected outright; a calendar
/// with zero events parses to an empty list. Properties outside an event
/// block and properties the importer does not store are ignored.
pub fn parse_calendar(content: &str) -> Result<Vec<IcsEvent>, IcsParseError> {
    let lines = unfold_lines(content);

    if !lines
        .iter()
        .any(|line| line.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(IcsParseError::NoCalendar);
    }

    let mut events = Vec::new();
    let mut current: Option<IcsEvent> = None;

    for line in &lines {
        if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            current = Some(IcsEvent::default());
            continue;
        }
        if line.eq_ignore_ascii_case("END:VEVENT") {
            if let Some(event) = current.take() {
                events.push(event);
            }
            continue;
        }

        let Some(event) = current.as_mut() else {
            continue;
        };
        let Some((name, value)) = split_property(line) else {
            continue;
        };

        match name.as_str() {
            "UID" => event.uid = Some(unescape_text(value)),
            "SUMMARY" => event.summary = Some(unescape_text(value)),
            "DESCRIPTION" => event.description = Some(unescape_text(value)),
            "DTSTART" => event.start = parse_ics_datetime(value),
            "DTEND" => event.end = parse_ics_datetime(value),
            "LOCATION" => event.location = Some(unescape_text(value)),
            "ORGANIZER" => event.organizer = Some(unescape_text(value)),
            "CATEGORIES" => event.categories = Some(unescape_text(value)),
            "PRIORITY" => event.priority = Some(value.trim().to_string()),
            _ => {}
        }
    }

    Ok(events)
}

/// Parses the three datetime shapes calendars carry in practice.
///
/// `YYYYMMDDTHHMMSSZ` is UTC, `YYYYMMDDTHHMMSS` is floating time treated as
/// UTC, `YYYYMMDD` is a date at midnight UTC. Anything else yields `None`
/// and the event imports without that bound.
pub fn parse_ics_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let bare = value.strip_suffix('Z').unwrap_or(value);

    if let Ok(naive) = NaiveDateTime::parse_from_str(bare, "%Y%m%dT%H%M%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(bare, "%Y%m%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    None
}

/// Joins folded lines: a line starting with a space or tab continues the
/// line before it (RFC 5545 section 3.1). Handles CRLF and bare LF endings.
fn unfold_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for raw in content.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }

        if !raw.is_empty() {
            lines.push(raw.to_string());
        }
    }

    lines
}

/// Splits a content line into (property name, value) at the first colon
/// outside a quoted parameter value. Parameters after `;` are dropped; the
/// supported datetime forms do not need them.
fn split_property(line: &str) -> Option<(String, &str)> {
    let mut in_quotes = false;

    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                let name_part = &line[..idx];
                let name = match name_part.split_once(';') {
                    Some((name, _params)) => name,
                    None => name_part,
                };
                return Some((name.trim().to_ascii_uppercase(), &line[idx + 1..]));
            }
            _ => {}
        }
    }

    None
}

/// Reverses RFC 5545 text escaping (`\n`, `\,`, `\;`, `\\`)
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_content_without_calendar() {
        assert_eq!(
            parse_calendar("hello world").unwrap_err(),
            IcsParseError::NoCalendar
        );
        assert_eq!(parse_calendar("").unwrap_err(), IcsParseError::NoCalendar);
    }

    #[test]
    fn test_empty_calendar_has_no_events() {
        let content = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";
        let events = parse_calendar(content).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_parses_full_event() {
        let content = concat!(
            "BEGIN:VCALENDAR\r\n",
            "VERSION:2.0\r\n",
            "PRODID:-//Test//Test//EN\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:event-1@example.edu\r\n",
            "SUMMARY:Homework 1\r\n",
            "DESCRIPTION:Submit via the portal\r\n",
            "DTSTART:20260101T090000Z\r\n",
            "DTEND:20260102T090000Z\r\n",
            "LOCATION:Room 101\r\n",
            "ORGANIZER;CN=\"Staff: TA\":mailto:ta@example.edu\r\n",
            "CATEGORIES:CS101\r\n",
            "PRIORITY:5\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );

        let events = parse_calendar(content).unwrap();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.uid.as_deref(), Some("event-1@example.edu"));
        assert_eq!(event.summary.as_deref(), Some("Homework 1"));
        assert_eq!(event.description.as_deref(), Some("Submit via the portal"));
        assert_eq!(event.location.as_deref(), Some("Room 101"));
        // The quoted CN parameter contains a colon; the value must still be
        // the mailto URI.
        assert_eq!(event.organizer.as_deref(), Some("mailto:ta@example.edu"));
        assert_eq!(event.categories.as_deref(), Some("CS101"));
        assert_eq!(event.priority.as_deref(), Some("5"));
        assert!(event.start.is_some());
        assert!(event.end.is_some());
        assert!(event.end.unwrap() > event.start.unwrap());
    }

    #[test]
    fn test_unfolds_continuation_lines() {
        let content = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:folded-1\r\n",
            "SUMMARY:A very long ti\r\n",
            " tle that was folded\r\n",
            "DESCRIPTION:Tab\r\n",
            "\tcontinued\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );

        let events = parse_calendar(content).unwrap();
        assert_eq!(
            events[0].summary.as_deref(),
            Some("A very long title that was folded")
        );
        assert_eq!(events[0].description.as_deref(), Some("Tabcontinued"));
    }

    #[test]
    fn test_parses_lf_only_line_endings() {
        let content = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nUID:lf-1\nSUMMARY:Quiz 2\nEND:VEVENT\nEND:VCALENDAR\n";
        let events = parse_calendar(content).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("Quiz 2"));
    }

    #[test]
    fn test_datetime_utc_form() {
        let parsed = parse_ics_datetime("20260315T143000Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-15T14:30:00+00:00");
    }

    #[test]
    fn test_datetime_floating_form_treated_as_utc() {
        let parsed = parse_ics_datetime("20260315T143000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-15T14:30:00+00:00");
    }

    #[test]
    fn test_datetime_date_only_form() {
        let parsed = parse_ics_datetime("20260315").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        assert!(parse_ics_datetime("not-a-date").is_none());
        assert!(parse_ics_datetime("2026-03-15").is_none());
        assert!(parse_ics_datetime("").is_none());
    }

    #[test]
    fn test_event_with_unparseable_datetime_keeps_other_fields() {
        let content = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:bad-date-1\r\n",
            "SUMMARY:Lecture\r\n",
            "DTSTART;TZID=America/Chicago:garbage\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );

        let events = parse_calendar(content).unwrap();
        assert_eq!(events[0].summary.as_deref(), Some("Lecture"));
        assert!(events[0].start.is_none());
    }

    #[test]
    fn test_unescapes_text_values() {
        let content = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:esc-1\r\n",
            "SUMMARY:Reading\\, chapter 3\\; notes\r\n",
            "DESCRIPTION:line one\\nline two\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );

        let events = parse_calendar(content).unwrap();
        assert_eq!(events[0].summary.as_deref(), Some("Reading, chapter 3; notes"));
        assert_eq!(events[0].description.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_multiple_events() {
        let content = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:a\r\n",
            "SUMMARY:First\r\n",
            "END:VEVENT\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:b\r\n",
            "SUMMARY:Second\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );

        let events = parse_calendar(content).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].uid.as_deref(), Some("a"));
        assert_eq!(events[1].uid.as_deref(), Some("b"));
    }

    #[test]
    fn test_event_without_summary_still_parses() {
        let content = concat!(
            "BEGIN:VCALENDAR\r\n",
            "BEGIN:VEVENT\r\n",
            "UID:no-summary\r\n",
            "DTSTART:20260101T000000Z\r\n",
            "END:VEVENT\r\n",
            "END:VCALENDAR\r\n",
        );

        let events = parse_calendar(content).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].summary.is_none());
    }
}
