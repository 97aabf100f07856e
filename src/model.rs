use quick_xml::events::Event;
use quick_xml::Reader;

// Shortest datetime string that still carries `YYYYMMDDHHmm`.
pub const MIN_TIMESTAMP_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Arrival,
    Departure,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Departure, Direction::Arrival];

    pub fn query_value(self) -> &'static str {
        match self {
            Direction::Arrival => "arrival",
            Direction::Departure => "departure",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Arrival => "ARRIVALS",
            Direction::Departure => "DEPARTURES",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Direction::Arrival => "ARR",
            Direction::Departure => "DEP",
        }
    }

    pub fn place_header(self) -> &'static str {
        match self {
            Direction::Arrival => "FROM",
            Direction::Departure => "TO",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlightRecord {
    pub flight_id: String,
    pub airport: String,
    pub schedule_datetime: String,
    pub estimated_datetime: String,
    pub remark: String,
}

impl FlightRecord {
    pub fn timestamp(&self) -> Option<&str> {
        usable_timestamp(&self.schedule_datetime, &self.estimated_datetime)
    }
}

pub fn usable_timestamp<'a>(schedule: &'a str, estimated: &'a str) -> Option<&'a str> {
    [schedule, estimated]
        .into_iter()
        .find(|value| value.len() >= MIN_TIMESTAMP_LEN)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StatusTier {
    Critical,
    Caution,
    Normal,
    #[default]
    Neutral,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayFlight {
    pub flight_id: String,
    pub airport: String,
    pub time: String,
    pub status: String,
    pub status_tier: StatusTier,
    pub schedule_datetime: String,
    pub estimated_datetime: String,
}

impl DisplayFlight {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.flight_id.is_empty()
            && self.airport.is_empty()
            && self.time.is_empty()
            && self.status.is_empty()
    }

    pub fn timestamp(&self) -> Option<&str> {
        usable_timestamp(&self.schedule_datetime, &self.estimated_datetime)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlightSet {
    pub arrivals: Vec<DisplayFlight>,
    pub departures: Vec<DisplayFlight>,
}

impl FlightSet {
    pub fn list(&self, direction: Direction) -> &[DisplayFlight] {
        match direction {
            Direction::Arrival => &self.arrivals,
            Direction::Departure => &self.departures,
        }
    }

    pub fn list_mut(&mut self, direction: Direction) -> &mut Vec<DisplayFlight> {
        match direction {
            Direction::Arrival => &mut self.arrivals,
            Direction::Departure => &mut self.departures,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Flights(Vec<FlightRecord>),
    UpstreamError(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemField {
    FlightId,
    Airport,
    Schedule,
    Estimated,
    Remark,
}

impl ItemField {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"flightId" => Some(ItemField::FlightId),
            b"airport" => Some(ItemField::Airport),
            b"scheduleDatetime" => Some(ItemField::Schedule),
            b"estimatedDatetime" => Some(ItemField::Estimated),
            b"remark" => Some(ItemField::Remark),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawItem {
    flight_id: String,
    airport: String,
    schedule: String,
    estimated: String,
    remark: String,
}

impl RawItem {
    fn push(&mut self, field: ItemField, text: &str) {
        let target = match field {
            ItemField::FlightId => &mut self.flight_id,
            ItemField::Airport => &mut self.airport,
            ItemField::Schedule => &mut self.schedule,
            ItemField::Estimated => &mut self.estimated,
            ItemField::Remark => &mut self.remark,
        };
        target.push_str(text);
    }

    fn into_record(self) -> FlightRecord {
        FlightRecord {
            flight_id: or_dash(self.flight_id),
            airport: or_dash(self.airport),
            schedule_datetime: self.schedule.trim().to_string(),
            estimated_datetime: self.estimated.trim().to_string(),
            remark: or_dash(self.remark),
        }
    }
}

fn or_dash(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "-".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parses a proxy response body. Every `<item>` anywhere in the document becomes
/// a record; a `returnAuthMsg` anywhere turns the whole payload into an error.
pub fn parse_payload(text: &str) -> Result<Payload, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut field: Option<ItemField> = None;
    let mut auth_msg: Option<String> = None;
    let mut in_auth = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                return Err(format!(
                    "xml error at {}: {err}",
                    reader.buffer_position()
                ))
            }
        };
        match event {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"item" => {
                    current = Some(RawItem::default());
                    field = None;
                }
                b"returnAuthMsg" => {
                    in_auth = true;
                    auth_msg.get_or_insert_with(String::new);
                }
                name => {
                    if current.is_some() {
                        field = ItemField::from_tag(name);
                    }
                }
            },
            Event::Empty(tag) => match tag.local_name().as_ref() {
                b"item" => records.push(RawItem::default().into_record()),
                b"returnAuthMsg" => {
                    auth_msg.get_or_insert_with(String::new);
                }
                _ => {}
            },
            Event::Text(content) => {
                let value = content.unescape().map_err(|err| err.to_string())?;
                push_text(&mut current, field, &mut auth_msg, in_auth, &value);
            }
            Event::CData(content) => {
                let bytes = content.into_inner();
                let value = String::from_utf8_lossy(&bytes);
                push_text(&mut current, field, &mut auth_msg, in_auth, &value);
            }
            Event::End(tag) => match tag.local_name().as_ref() {
                b"item" => {
                    if let Some(item) = current.take() {
                        records.push(item.into_record());
                    }
                    field = None;
                }
                b"returnAuthMsg" => in_auth = false,
                _ => field = None,
            },
            Event::Eof => break,
            _ => {}
        }
    }

    match auth_msg {
        Some(msg) => {
            let msg = msg.trim();
            Ok(Payload::UpstreamError(if msg.is_empty() {
                "upstream error".to_string()
            } else {
                msg.to_string()
            }))
        }
        None => Ok(Payload::Flights(records)),
    }
}

fn push_text(
    current: &mut Option<RawItem>,
    field: Option<ItemField>,
    auth_msg: &mut Option<String>,
    in_auth: bool,
    value: &str,
) {
    if in_auth {
        if let Some(msg) = auth_msg.as_mut() {
            msg.push_str(value);
        }
        return;
    }
    if let (Some(item), Some(field)) = (current.as_mut(), field) {
        item.push(field, value);
    }
}
