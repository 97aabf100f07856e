use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::model::{parse_payload, Direction, FlightRecord, FlightSet, Payload};
use crate::translate::Translator;
use crate::window::{filter_by_window, with_fallback, WindowPolicy};

// Days fetched around today, so windows that straddle midnight stay populated.
const DAY_OFFSETS: [i64; 3] = [-1, 0, 1];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("upstream rejected request: {0}")]
    Upstream(String),
    #[error("malformed payload: {0}")]
    Payload(String),
}

pub trait FlightSource: Sync {
    fn fetch(&self, direction: Direction, date: NaiveDate) -> Result<String, FetchError>;
}

pub struct ProxyClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim().to_string(),
        })
    }

    fn request_url(&self, direction: Direction, date: NaiveDate, cache_buster: i64) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}type={}&date={}&_t={}",
            self.base_url,
            separator,
            direction.query_value(),
            format_date(date),
            cache_buster
        )
    }
}

impl FlightSource for ProxyClient {
    fn fetch(&self, direction: Direction, date: NaiveDate) -> Result<String, FetchError> {
        let url = self.request_url(direction, date, Utc::now().timestamp_millis());
        debug!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        resp.text()
            .map_err(|err| FetchError::Transport(err.to_string()))
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn fetch_dates(today: NaiveDate) -> [NaiveDate; 3] {
    DAY_OFFSETS.map(|offset| today + chrono::Duration::days(offset))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchSettings {
    pub policy: WindowPolicy,
    pub fallback_limit: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            policy: WindowPolicy::default(),
            fallback_limit: 20,
        }
    }
}

fn load_slice<S: FlightSource + ?Sized>(
    source: &S,
    direction: Direction,
    date: NaiveDate,
) -> Result<Vec<FlightRecord>, FetchError> {
    let body = source.fetch(direction, date)?;
    match parse_payload(&body).map_err(FetchError::Payload)? {
        Payload::Flights(records) => Ok(records),
        Payload::UpstreamError(msg) => Err(FetchError::Upstream(msg)),
    }
}

// `None` is a failed request; it contributes nothing to the merge.
fn fetch_slice<S: FlightSource + ?Sized>(
    source: &S,
    direction: Direction,
    date: NaiveDate,
) -> Option<Vec<FlightRecord>> {
    match load_slice(source, direction, date) {
        Ok(records) => {
            debug!(
                "{} {} -> {} records",
                direction.query_value(),
                format_date(date),
                records.len()
            );
            Some(records)
        }
        Err(err) => {
            warn!(
                "Failed to fetch {} on {}: {err}",
                direction.query_value(),
                format_date(date)
            );
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub flights: FlightSet,
    pub failed_requests: usize,
    pub total_requests: usize,
}

pub fn fetch_all<S: FlightSource + ?Sized>(
    source: &S,
    translator: &Translator,
    now: NaiveDateTime,
    settings: &FetchSettings,
) -> Result<FetchOutcome> {
    let dates = fetch_dates(now.date());
    info!(
        "Fetching flight data for dates: {}",
        dates.map(format_date).join(", ")
    );

    let joined = thread::scope(|scope| {
        let handles: Vec<_> = dates
            .iter()
            .flat_map(|date| Direction::ALL.map(|direction| (*date, direction)))
            .map(|(date, direction)| {
                let handle = scope.spawn(move || fetch_slice(source, direction, date));
                (direction, date, handle)
            })
            .collect();
        handles
            .into_iter()
            .map(|(direction, date, handle)| (direction, date, handle.join()))
            .collect::<Vec<_>>()
    });

    let total_requests = joined.len();
    let mut failed_requests = 0;
    let mut merged = FlightSet::default();
    for (direction, date, result) in joined {
        let records = result.map_err(|_| {
            anyhow!(
                "fetch worker for {} on {} panicked",
                direction.query_value(),
                format_date(date)
            )
        })?;
        match records {
            Some(records) => merged
                .list_mut(direction)
                .extend(records.iter().map(|record| translator.display(record))),
            None => failed_requests += 1,
        }
    }

    let mut set = FlightSet::default();
    for direction in Direction::ALL {
        let all = merged.list(direction);
        let filtered = filter_by_window(all, direction, now, &settings.policy);
        *set.list_mut(direction) = with_fallback(filtered, all, direction, settings.fallback_limit);
    }

    info!(
        "updated dep={} arr={} failed={}/{}",
        set.departures.len(),
        set.arrivals.len(),
        failed_requests,
        total_requests
    );
    Ok(FetchOutcome {
        flights: set,
        failed_requests,
        total_requests,
    })
}

#[derive(Debug)]
pub enum RefreshMessage {
    Updated(FetchOutcome),
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshCommand {
    Now,
}

/// Background refresh loop. Cycles run back to back on this one thread, so a
/// slow cycle delays the next instead of overlapping it.
pub fn spawn_refresher<S>(
    source: S,
    translator: Translator,
    settings: FetchSettings,
    interval: Duration,
    tx: Sender<RefreshMessage>,
    commands: Receiver<RefreshCommand>,
) -> JoinHandle<()>
where
    S: FlightSource + Send + 'static,
{
    thread::spawn(move || {
        info!("refresher started");
        loop {
            let now = Local::now().naive_local();
            let message = match fetch_all(&source, &translator, now, &settings) {
                Ok(outcome) => RefreshMessage::Updated(outcome),
                Err(err) => {
                    error!("Critical Error in fetch cycle: {err:#}");
                    RefreshMessage::Failed(err.to_string())
                }
            };
            if tx.send(message).is_err() {
                debug!("receiver dropped, exiting refresher");
                break;
            }

            match commands.recv_timeout(interval) {
                Ok(RefreshCommand::Now) => {
                    // Requests queued during the last cycle collapse into one.
                    while commands.try_recv().is_ok() {}
                    debug!("manual refresh");
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("command channel closed, exiting refresher");
                    break;
                }
            }
        }
    })
}
