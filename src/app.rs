use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::flap::FlapBoard;
use crate::model::{Direction, DisplayFlight, FlightSet};
use crate::net::FetchOutcome;
use crate::paging::{current_rows, page_count, PageCursors};
use crate::viewport::{ResizeDebouncer, Viewport};

pub struct App {
    pub(crate) proxy_url: String,
    pub(crate) refresh: Duration,
    pub(crate) flights: FlightSet,
    pub(crate) cursors: PageCursors,
    pub(crate) rows_per_page: usize,
    pub(crate) last_update: Option<SystemTime>,
    pub(crate) last_error: Option<String>,
    pub(crate) partial_failure: Option<(usize, usize)>,
    rotation: Duration,
    last_rotation: Instant,
    debouncer: ResizeDebouncer,
    flap_animation: bool,
    arrival_board: FlapBoard,
    departure_board: FlapBoard,
}

impl App {
    pub fn new(config: &Config, rows_per_page: usize, now: Instant) -> Self {
        let mut app = Self {
            proxy_url: config.proxy_url.clone(),
            refresh: config.refresh,
            flights: FlightSet::default(),
            cursors: PageCursors::default(),
            rows_per_page,
            last_update: None,
            last_error: None,
            partial_failure: None,
            rotation: config.rotation,
            last_rotation: now,
            debouncer: ResizeDebouncer::new(config.resize_settle),
            flap_animation: config.flap_animation,
            arrival_board: FlapBoard::default(),
            departure_board: FlapBoard::default(),
        };
        app.sync_boards(now);
        app
    }

    pub fn apply_outcome(&mut self, outcome: FetchOutcome, now: Instant) {
        self.partial_failure = (outcome.failed_requests > 0)
            .then_some((outcome.failed_requests, outcome.total_requests));
        self.apply_update(outcome.flights, now);
    }

    pub fn apply_update(&mut self, flights: FlightSet, now: Instant) {
        debug!(
            "apply_update arrivals={} departures={}",
            flights.arrivals.len(),
            flights.departures.len()
        );
        self.flights = flights;
        self.cursors.reset();
        self.last_update = Some(SystemTime::now());
        self.last_error = None;
        self.sync_boards(now);
    }

    // The previous flights stay on screen.
    pub fn apply_error(&mut self, msg: String) {
        warn!("apply_error: {msg}");
        self.last_error = Some(msg);
    }

    pub fn rotation_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_rotation) >= self.rotation
    }

    pub fn rotate(&mut self, now: Instant) {
        self.cursors.rotate(&self.flights, self.rows_per_page);
        self.last_rotation = now;
        self.sync_boards(now);
    }

    pub fn observe_resize(&mut self, viewport: Viewport, now: Instant) {
        self.debouncer.observe(viewport, now);
    }

    pub fn poll_resize(&mut self, now: Instant) -> bool {
        match self.debouncer.poll(now) {
            Some(viewport) => self.apply_viewport(viewport, now),
            None => false,
        }
    }

    pub fn apply_viewport(&mut self, viewport: Viewport, now: Instant) -> bool {
        let rows = viewport.rows_per_page();
        if rows == self.rows_per_page {
            return false;
        }
        info!(
            "rows per page {} -> {} ({}x{}px)",
            self.rows_per_page, rows, viewport.width, viewport.height
        );
        self.rows_per_page = rows;
        self.arrival_board.clear();
        self.departure_board.clear();
        self.cursors.reset();
        self.sync_boards(now);
        true
    }

    pub fn advance_tick(&mut self, now: Instant) {
        self.arrival_board.tick(now);
        self.departure_board.tick(now);
    }

    pub fn is_animating(&self) -> bool {
        !(self.arrival_board.is_settled() && self.departure_board.is_settled())
    }

    pub fn board(&self, direction: Direction) -> &FlapBoard {
        match direction {
            Direction::Arrival => &self.arrival_board,
            Direction::Departure => &self.departure_board,
        }
    }

    pub fn page_rows(&self, direction: Direction) -> Vec<DisplayFlight> {
        current_rows(&self.flights, &self.cursors, direction, self.rows_per_page)
    }

    pub fn page_indicator(&self, direction: Direction) -> (usize, usize) {
        let len = self.flights.list(direction).len();
        let pages = page_count(len, self.rows_per_page);
        let page = self.cursors.current_page(direction, len, self.rows_per_page);
        (page + 1, pages)
    }

    fn sync_boards(&mut self, now: Instant) {
        let arrivals = self.page_rows(Direction::Arrival);
        let departures = self.page_rows(Direction::Departure);
        self.arrival_board
            .set_target(&arrivals, now, self.flap_animation);
        self.departure_board
            .set_target(&departures, now, self.flap_animation);
    }
}
