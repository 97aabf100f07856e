use tracing::debug;

use crate::model::{Direction, DisplayFlight, FlightSet};

/// Independent page cursors for the two boards.
///
/// Cursors are raw counters; the visible page is always derived as
/// `cursor % page_count`, so a cursor left over from a longer list never
/// indexes past the end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageCursors {
    arrivals: usize,
    departures: usize,
}

impl PageCursors {
    pub fn get(&self, direction: Direction) -> usize {
        match direction {
            Direction::Arrival => self.arrivals,
            Direction::Departure => self.departures,
        }
    }

    fn get_mut(&mut self, direction: Direction) -> &mut usize {
        match direction {
            Direction::Arrival => &mut self.arrivals,
            Direction::Departure => &mut self.departures,
        }
    }

    pub fn reset(&mut self) {
        self.arrivals = 0;
        self.departures = 0;
    }

    pub fn rotate(&mut self, flights: &FlightSet, rows_per_page: usize) {
        for direction in Direction::ALL {
            let pages = page_count(flights.list(direction).len(), rows_per_page);
            if pages > 1 {
                let cursor = self.get_mut(direction);
                *cursor = (*cursor + 1) % pages;
                debug!("rotate {} -> page {}/{}", direction.short_label(), *cursor + 1, pages);
            }
        }
    }

    pub fn current_page(&self, direction: Direction, len: usize, rows_per_page: usize) -> usize {
        self.get(direction) % page_count(len, rows_per_page)
    }
}

pub fn page_count(len: usize, rows_per_page: usize) -> usize {
    if rows_per_page == 0 {
        return 1;
    }
    len.div_ceil(rows_per_page).max(1)
}

pub fn visible_slice(flights: &[DisplayFlight], page: usize, rows_per_page: usize) -> &[DisplayFlight] {
    let start = page.saturating_mul(rows_per_page).min(flights.len());
    let end = start.saturating_add(rows_per_page).min(flights.len());
    &flights[start..end]
}

pub fn pad_to_row_count(mut rows: Vec<DisplayFlight>, rows_per_page: usize) -> Vec<DisplayFlight> {
    if rows.len() < rows_per_page {
        rows.resize_with(rows_per_page, DisplayFlight::blank);
    }
    rows
}

pub fn current_rows(
    flights: &FlightSet,
    cursors: &PageCursors,
    direction: Direction,
    rows_per_page: usize,
) -> Vec<DisplayFlight> {
    let list = flights.list(direction);
    let page = cursors.current_page(direction, list.len(), rows_per_page);
    pad_to_row_count(visible_slice(list, page, rows_per_page).to_vec(), rows_per_page)
}
