use std::collections::HashMap;
use tracing::warn;

use crate::model::{DisplayFlight, FlightRecord, StatusTier};

pub const MISSING_TIME: &str = "--:--";

// Scanned in order; first substring contained in the remark wins.
const STATUS_LABELS: &[(&str, &str)] = &[
    ("도착", "ARRIVED"),
    ("출발", "DEPARTED"),
    ("지연", "DELAYED"),
    ("결항", "CANCELLED"),
    ("취소", "CANCELLED"),
    ("탑승중", "BOARDING"),
    ("탑승준비", "GATE OPEN"),
    ("마감", "CLOSED"),
    ("예정", "SCHEDULED"),
    ("탑승구변경", "GATE CHNG"),
    ("수하물", "BAGGAGE"),
    ("체크인", "CHECK-IN"),
    ("이륙", "TAKE OFF"),
];

const CRITICAL_REMARKS: &[&str] = &["결항", "취소", "회항"];
const CAUTION_REMARKS: &[&str] = &["지연", "탑승구변경", "탑승중", "마감"];
const NORMAL_REMARKS: &[&str] = &["도착", "출발", "이륙"];

#[derive(Clone, Debug, Default)]
pub struct Translator {
    airports: HashMap<String, String>,
}

impl Translator {
    pub fn new(airports: HashMap<String, String>) -> Self {
        Self { airports }
    }

    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }

    pub fn translate_airport(&self, raw: &str) -> String {
        if let Some(code) = self.airports.get(raw) {
            return code.clone();
        }
        let clean = strip_qualifier(raw);
        if let Some(code) = self.airports.get(&clean) {
            return code.clone();
        }

        let fallback = raw.to_uppercase();
        if fallback.chars().any(is_non_latin_letter) {
            warn!("missing airport translation: {raw}");
        }
        fallback
    }

    pub fn display(&self, record: &FlightRecord) -> DisplayFlight {
        DisplayFlight {
            flight_id: record.flight_id.clone(),
            airport: self.translate_airport(&record.airport),
            time: format_time(record.timestamp()),
            status: translate_status(&record.remark),
            status_tier: classify_status(&record.remark),
            schedule_datetime: record.schedule_datetime.clone(),
            estimated_datetime: record.estimated_datetime.clone(),
        }
    }
}

pub fn translate_status(raw: &str) -> String {
    STATUS_LABELS
        .iter()
        .find(|(needle, _)| raw.contains(*needle))
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| raw.to_uppercase())
}

/// Severity is read from the raw remark, never from the translated label.
pub fn classify_status(raw: &str) -> StatusTier {
    let any = |needles: &[&str]| needles.iter().any(|needle| raw.contains(*needle));
    if any(CRITICAL_REMARKS) {
        StatusTier::Critical
    } else if any(CAUTION_REMARKS) {
        StatusTier::Caution
    } else if any(NORMAL_REMARKS) {
        StatusTier::Normal
    } else {
        StatusTier::Neutral
    }
}

pub fn format_time(timestamp: Option<&str>) -> String {
    let Some(value) = timestamp else {
        return MISSING_TIME.to_string();
    };
    match (value.get(8..10), value.get(10..12)) {
        (Some(hours), Some(minutes)) => format!("{hours}:{minutes}"),
        _ => MISSING_TIME.to_string(),
    }
}

// `"X(Y)"` -> `"X"`: drops everything from the first `(` through the last `)`.
fn strip_qualifier(raw: &str) -> String {
    match (raw.find('('), raw.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            format!("{}{}", &raw[..open], &raw[close + 1..]).trim().to_string()
        }
        _ => raw.trim().to_string(),
    }
}

fn is_non_latin_letter(c: char) -> bool {
    c.is_alphabetic() && !c.is_ascii() && !('\u{00C0}'..='\u{024F}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::{classify_status, format_time, strip_qualifier, translate_status, Translator};
    use crate::model::{FlightRecord, StatusTier};
    use std::collections::HashMap;

    fn translator() -> Translator {
        let mut table = HashMap::new();
        table.insert("다낭".to_string(), "DANANG".to_string());
        table.insert("나리타".to_string(), "TOKYO/NARITA".to_string());
        Translator::new(table)
    }

    #[test]
    fn airport_lookup_and_fallbacks() {
        let t = translator();
        assert_eq!(t.translate_airport("다낭"), "DANANG");
        assert_eq!(t.translate_airport("다낭(다낭)"), "DANANG");
        assert_eq!(t.translate_airport("나리타 (도쿄)"), "TOKYO/NARITA");
        assert_eq!(t.translate_airport("los angeles"), "LOS ANGELES");
        assert_eq!(t.translate_airport("하노이"), "하노이");
        assert_eq!(Translator::default().translate_airport("다낭"), "다낭");
    }

    #[test]
    fn qualifier_stripping() {
        assert_eq!(strip_qualifier("X(Y)"), "X");
        assert_eq!(strip_qualifier("X (Y) "), "X");
        assert_eq!(strip_qualifier("X(Y)Z"), "XZ");
        assert_eq!(strip_qualifier(")X("), ")X(");
        assert_eq!(strip_qualifier("PLAIN"), "PLAIN");
    }

    #[test]
    fn status_labels() {
        assert_eq!(translate_status("지연"), "DELAYED");
        assert_eq!(translate_status("출발지연"), "DEPARTED");
        assert_eq!(translate_status("결항"), "CANCELLED");
        assert_eq!(translate_status("탑승준비"), "GATE OPEN");
        assert_eq!(translate_status("탑승구변경"), "GATE CHNG");
        assert_eq!(translate_status("on time"), "ON TIME");
        assert_eq!(translate_status("-"), "-");
    }

    #[test]
    fn status_tiers_follow_raw_remark() {
        assert_eq!(classify_status("결항"), StatusTier::Critical);
        assert_eq!(classify_status("회항"), StatusTier::Critical);
        assert_eq!(classify_status("지연"), StatusTier::Caution);
        assert_eq!(classify_status("탑승중"), StatusTier::Caution);
        assert_eq!(classify_status("마감"), StatusTier::Caution);
        assert_eq!(classify_status("도착"), StatusTier::Normal);
        assert_eq!(classify_status("이륙"), StatusTier::Normal);
        assert_eq!(classify_status("예정"), StatusTier::Neutral);
        assert_eq!(classify_status("DELAYED"), StatusTier::Neutral);
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(Some("202401010930")), "09:30");
        assert_eq!(format_time(Some("20240101235900")), "23:59");
        assert_eq!(format_time(Some("2024010109")), "--:--");
        assert_eq!(format_time(None), "--:--");
    }

    #[test]
    fn delayed_arrival_display() {
        let record = FlightRecord {
            flight_id: "KE123".to_string(),
            airport: "다낭".to_string(),
            schedule_datetime: "202401010930".to_string(),
            estimated_datetime: String::new(),
            remark: "지연".to_string(),
        };
        let flight = translator().display(&record);
        assert!(flight.status.contains("DELAYED"));
        assert_eq!(flight.status_tier, StatusTier::Caution);
        assert_eq!(flight.time, "09:30");
        assert_eq!(flight.airport, "DANANG");
        assert_eq!(flight.schedule_datetime, "202401010930");
    }

    #[test]
    fn missing_timestamps_use_sentinel() {
        let record = FlightRecord {
            schedule_datetime: "2024".to_string(),
            ..FlightRecord::default()
        };
        assert_eq!(translator().display(&record).time, "--:--");
    }
}
