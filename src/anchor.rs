//! Wall-clock anchoring of the relative minute timeline.
//!
//! Offsets stay in minutes from project start; anchoring is a post-step that
//! adds them to a concrete local datetime. Backward anchoring derives the
//! project start by subtracting the resolved makespan from the deadline.
//! All arithmetic is minute-precise and local-naive: no timezone or DST
//! correction is applied.

use chrono::{Duration, NaiveDateTime};

use crate::models::TimeConstraint;

/// Accepted input shapes, tried in order. A bare date parses as midnight.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO local datetime, tolerating a trailing `Z` or numeric offset
/// suffix (stripped, not converted).
pub fn parse_local(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim().trim_end_matches('Z');
    let s = match s.char_indices().rfind(|&(i, c)| (c == '+' || c == '-') && i > 10) {
        Some((i, _)) => &s[..i],
        None => s,
    };

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn format_local(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Resolve the wall-clock instant of offset 0, if the template is anchored.
///
/// Forward anchoring uses the given start directly; backward anchoring
/// places the schedule so its resolved makespan ends exactly at the
/// deadline. A constraint with both ends set is rejected upstream.
pub fn project_start(
    constraint: Option<&TimeConstraint>,
    makespan_mins: i64,
) -> Option<NaiveDateTime> {
    let constraint = constraint?;
    match (&constraint.start_time, &constraint.end_time) {
        (Some(start), _) => parse_local(start),
        (None, Some(end)) => parse_local(end).map(|dt| dt - Duration::minutes(makespan_mins)),
        (None, None) => None,
    }
}

/// Wall-clock strings for one step's offsets against an anchored start.
pub fn anchor_step(base: NaiveDateTime, start_offset: i64, end_offset: i64) -> (String, String) {
    (
        format_local(base + Duration::minutes(start_offset)),
        format_local(base + Duration::minutes(end_offset)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        parse_local(s).unwrap()
    }

    #[test]
    fn test_parse_accepted_formats() {
        assert!(parse_local("2026-03-01T19:00:00").is_some());
        assert!(parse_local("2026-03-01T19:00").is_some());
        assert!(parse_local("2026-03-01 19:00:00").is_some());
        assert!(parse_local("2026-03-01 19:00").is_some());
        assert_eq!(
            format_local(dt("2026-03-01")),
            "2026-03-01T00:00:00"
        );
    }

    #[test]
    fn test_parse_strips_zone_suffixes() {
        assert_eq!(
            format_local(dt("2026-03-01T19:00:00Z")),
            "2026-03-01T19:00:00"
        );
        assert_eq!(
            format_local(dt("2026-03-01T19:00:00+02:00")),
            "2026-03-01T19:00:00"
        );
        assert_eq!(
            format_local(dt("2026-03-01T19:00:00-05:00")),
            "2026-03-01T19:00:00"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_local("not a date").is_none());
        assert!(parse_local("19:00").is_none());
    }

    #[test]
    fn test_forward_anchor_uses_start() {
        let constraint = TimeConstraint {
            start_time: Some("2026-03-01T08:00".to_string()),
            end_time: None,
        };
        let base = project_start(Some(&constraint), 120).unwrap();
        assert_eq!(format_local(base), "2026-03-01T08:00:00");

        let (start, end) = anchor_step(base, 15, 105);
        assert_eq!(start, "2026-03-01T08:15:00");
        assert_eq!(end, "2026-03-01T09:45:00");
    }

    #[test]
    fn test_backward_anchor_subtracts_makespan() {
        let constraint = TimeConstraint {
            start_time: None,
            end_time: Some("2026-03-01T19:00".to_string()),
        };
        let base = project_start(Some(&constraint), 120).unwrap();
        assert_eq!(format_local(base), "2026-03-01T17:00:00");

        // The last step's end lands exactly on the deadline.
        let (_, end) = anchor_step(base, 115, 120);
        assert_eq!(end, "2026-03-01T19:00:00");
    }

    #[test]
    fn test_unanchored_template() {
        assert!(project_start(None, 60).is_none());
        let empty = TimeConstraint {
            start_time: None,
            end_time: None,
        };
        assert!(project_start(Some(&empty), 60).is_none());
    }
}
