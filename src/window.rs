use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::model::{Direction, DisplayFlight};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPolicy {
    pub arrival_before: Duration,
    pub arrival_after: Duration,
    pub departure_before: Duration,
    pub departure_after: Duration,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            arrival_before: Duration::hours(4),
            arrival_after: Duration::hours(4),
            departure_before: Duration::hours(1),
            departure_after: Duration::hours(6),
        }
    }
}

impl WindowPolicy {
    pub fn from_minutes(arrival: (u32, u32), departure: (u32, u32)) -> Self {
        Self {
            arrival_before: Duration::minutes(i64::from(arrival.0)),
            arrival_after: Duration::minutes(i64::from(arrival.1)),
            departure_before: Duration::minutes(i64::from(departure.0)),
            departure_after: Duration::minutes(i64::from(departure.1)),
        }
    }

    pub fn bounds(&self, direction: Direction, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let (before, after) = match direction {
            Direction::Arrival => (self.arrival_before, self.arrival_after),
            Direction::Departure => (self.departure_before, self.departure_after),
        };
        (now - before, now + after)
    }
}

pub fn parse_local_timestamp(value: &str) -> Option<NaiveDateTime> {
    let field = |range: std::ops::Range<usize>| value.get(range)?.parse::<u32>().ok();
    let year = value.get(0..4)?.parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)?;
    date.and_hms_opt(field(8..10)?, field(10..12)?, 0)
}

/// Keeps flights whose timestamp falls inside the direction's window, oldest first.
pub fn filter_by_window(
    flights: &[DisplayFlight],
    direction: Direction,
    now: NaiveDateTime,
    policy: &WindowPolicy,
) -> Vec<DisplayFlight> {
    let (min_time, max_time) = policy.bounds(direction, now);

    let mut kept: Vec<DisplayFlight> = flights
        .iter()
        .filter(|flight| {
            flight
                .timestamp()
                .and_then(parse_local_timestamp)
                .is_some_and(|at| at >= min_time && at <= max_time)
        })
        .cloned()
        .collect();

    // Fixed-width zero-padded digits, so lexical order is chronological.
    kept.sort_by(|a, b| a.timestamp().cmp(&b.timestamp()));

    info!(
        "[{}] Filtered: {} / Total: {}",
        direction.query_value(),
        kept.len(),
        flights.len()
    );
    kept
}

pub fn with_fallback(
    filtered: Vec<DisplayFlight>,
    all: &[DisplayFlight],
    direction: Direction,
    limit: usize,
) -> Vec<DisplayFlight> {
    if !filtered.is_empty() || all.is_empty() {
        return filtered;
    }
    let fallback: Vec<DisplayFlight> = all
        .iter()
        .filter(|flight| flight.timestamp().is_some())
        .take(limit)
        .cloned()
        .collect();
    warn!(
        "[{}] no flights inside window, showing {} unfiltered",
        direction.query_value(),
        fallback.len()
    );
    fallback
}

#[cfg(test)]
mod tests {
    use super::{filter_by_window, parse_local_timestamp, with_fallback, WindowPolicy};
    use crate::model::{Direction, DisplayFlight};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn stamp(at: NaiveDateTime) -> String {
        at.format("%Y%m%d%H%M").to_string()
    }

    fn flight(id: &str, schedule: &str) -> DisplayFlight {
        DisplayFlight {
            flight_id: id.to_string(),
            schedule_datetime: schedule.to_string(),
            ..DisplayFlight::default()
        }
    }

    fn ids(flights: &[DisplayFlight]) -> Vec<&str> {
        flights.iter().map(|f| f.flight_id.as_str()).collect()
    }

    #[test]
    fn parses_local_calendar_fields() {
        let at = parse_local_timestamp("202401010930").unwrap();
        assert_eq!(stamp(at), "202401010930");
        assert_eq!(parse_local_timestamp("20240101093059").map(stamp).as_deref(), Some("202401010930"));
        assert!(parse_local_timestamp("202413010930").is_none());
        assert!(parse_local_timestamp("2024010109ab").is_none());
        assert!(parse_local_timestamp("20240101").is_none());
    }

    #[test]
    fn both_windows_include_now_and_exclude_two_days_away() {
        let policy = WindowPolicy::default();
        let flights = vec![
            flight("PAST", &stamp(now() - Duration::hours(48))),
            flight("NOW", &stamp(now())),
            flight("FUTURE", &stamp(now() + Duration::hours(48))),
        ];
        for direction in Direction::ALL {
            let kept = filter_by_window(&flights, direction, now(), &policy);
            assert_eq!(ids(&kept), vec!["NOW"], "{direction:?}");
        }
    }

    #[test]
    fn windows_differ_per_direction() {
        let policy = WindowPolicy::default();
        let flights = vec![
            flight("EARLY", &stamp(now() - Duration::hours(3))),
            flight("LATE", &stamp(now() + Duration::hours(5))),
        ];
        let arrivals = filter_by_window(&flights, Direction::Arrival, now(), &policy);
        let departures = filter_by_window(&flights, Direction::Departure, now(), &policy);
        assert_eq!(ids(&arrivals), vec!["EARLY"]);
        assert_eq!(ids(&departures), vec!["LATE"]);
    }

    #[test]
    fn bounds_are_inclusive() {
        let policy = WindowPolicy::default();
        let flights = vec![
            flight("MIN", &stamp(now() - Duration::hours(1))),
            flight("MAX", &stamp(now() + Duration::hours(6))),
            flight("OUT", &stamp(now() + Duration::hours(6) + Duration::minutes(1))),
        ];
        let kept = filter_by_window(&flights, Direction::Departure, now(), &policy);
        assert_eq!(ids(&kept), vec!["MIN", "MAX"]);
    }

    #[test]
    fn sorted_chronologically_and_invalid_dropped() {
        let policy = WindowPolicy::default();
        let estimated_only = DisplayFlight {
            flight_id: "EST".to_string(),
            estimated_datetime: stamp(now() + Duration::minutes(30)),
            ..DisplayFlight::default()
        };
        let flights = vec![
            flight("C", &stamp(now() + Duration::hours(2))),
            flight("BAD", "2024"),
            flight("A", &stamp(now() - Duration::hours(1))),
            estimated_only,
            flight("MONTH13", "202413011200"),
        ];
        let kept = filter_by_window(&flights, Direction::Arrival, now(), &policy);
        assert_eq!(ids(&kept), vec!["A", "EST", "C"]);
    }

    #[test]
    fn fallback_uses_bounded_valid_prefix() {
        let policy = WindowPolicy::default();
        let far = stamp(now() + Duration::hours(48));
        let mut flights: Vec<DisplayFlight> = (0..30).map(|i| flight(&format!("F{i}"), &far)).collect();
        flights.insert(0, flight("BAD", ""));

        let filtered = filter_by_window(&flights, Direction::Departure, now(), &policy);
        assert!(filtered.is_empty());
        let shown = with_fallback(filtered, &flights, Direction::Departure, 20);
        assert_eq!(shown.len(), 20);
        assert_eq!(shown[0].flight_id, "F0");
        assert_eq!(shown[19].flight_id, "F19");
    }

    #[test]
    fn fallback_leaves_non_empty_and_empty_inputs_alone() {
        let kept = vec![flight("A", "202401011200")];
        assert_eq!(with_fallback(kept.clone(), &kept, Direction::Arrival, 20), kept);
        assert!(with_fallback(Vec::new(), &[], Direction::Arrival, 20).is_empty());
    }
}
