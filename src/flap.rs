use std::time::{Duration, Instant};

use crate::model::{DisplayFlight, StatusTier};

pub const DRUM: &str = " ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-:./";

pub const CELL_WIDTHS: [usize; 4] = [7, 19, 5, 9];

const ROW_DELAY: Duration = Duration::from_millis(50);
const CELL_DELAY: Duration = Duration::from_millis(20);
const CHAR_DELAY: Duration = Duration::from_millis(10);
const STEP: Duration = Duration::from_millis(60);
const BASE_STEPS: usize = 5;

pub fn flap_text(text: &str, width: usize) -> String {
    let source = if text.is_empty() { "-" } else { text };
    let mut out: String = source.to_uppercase().chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out
}

pub fn cell_texts(flight: &DisplayFlight) -> [String; 4] {
    if flight.is_blank() {
        return CELL_WIDTHS.map(|width| " ".repeat(width));
    }
    let values = [
        flight.flight_id.as_str(),
        flight.airport.as_str(),
        flight.time.as_str(),
        flight.status.as_str(),
    ];
    let mut texts: [String; 4] = Default::default();
    for (slot, (value, width)) in texts.iter_mut().zip(values.into_iter().zip(CELL_WIDTHS)) {
        *slot = flap_text(value, width);
    }
    texts
}

fn drum_index(c: char) -> Option<usize> {
    DRUM.chars().position(|d| d == c)
}

fn drum_char(index: usize) -> char {
    DRUM.chars().nth(index % DRUM.chars().count()).unwrap_or(' ')
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct FlapChar {
    shown: char,
    target: char,
    steps_left: usize,
    next_at: Option<Instant>,
}

impl FlapChar {
    fn settled(c: char) -> Self {
        Self {
            shown: c,
            target: c,
            steps_left: 0,
            next_at: None,
        }
    }

    fn retarget(&mut self, target: char, start: Instant, jitter: usize) {
        self.target = target;
        if self.shown == target {
            self.steps_left = 0;
            self.next_at = None;
            return;
        }
        let Some(to) = drum_index(target) else {
            self.shown = target;
            self.steps_left = 0;
            self.next_at = None;
            return;
        };
        let from = drum_index(self.shown).unwrap_or(0);
        let len = DRUM.chars().count();
        let distance = (to + len - from) % len;
        self.steps_left = distance.min(BASE_STEPS + jitter % BASE_STEPS);
        self.next_at = Some(start + STEP);
    }

    fn advance(&mut self, now: Instant) -> bool {
        while let Some(at) = self.next_at {
            if at > now {
                return true;
            }
            if self.steps_left == 0 {
                self.shown = self.target;
                self.next_at = None;
                return false;
            }
            let from = drum_index(self.shown).unwrap_or(0);
            self.shown = drum_char(from + 1);
            self.steps_left -= 1;
            self.next_at = Some(at + STEP);
        }
        false
    }
}

#[derive(Clone, Debug)]
pub struct FlapRow {
    cells: [Vec<FlapChar>; 4],
    pub tier: StatusTier,
}

impl FlapRow {
    fn settled(texts: &[String; 4], tier: StatusTier) -> Self {
        Self {
            cells: texts
                .clone()
                .map(|text| text.chars().map(FlapChar::settled).collect()),
            tier,
        }
    }

    pub fn texts(&self) -> [String; 4] {
        self.cells
            .clone()
            .map(|cell| cell.iter().map(|c| c.shown).collect())
    }
}

#[derive(Clone, Debug, Default)]
pub struct FlapBoard {
    rows: Vec<FlapRow>,
}

impl FlapBoard {
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn rows(&self) -> &[FlapRow] {
        &self.rows
    }

    /// Points the board at a new page. A board with no rows (or a different
    /// row count) is drawn straight away; otherwise changed characters flip.
    pub fn set_target(&mut self, flights: &[DisplayFlight], now: Instant, animate: bool) {
        if !animate || self.rows.len() != flights.len() {
            self.rows = flights
                .iter()
                .map(|flight| FlapRow::settled(&cell_texts(flight), flight.status_tier))
                .collect();
            return;
        }

        for (row_idx, (row, flight)) in self.rows.iter_mut().zip(flights).enumerate() {
            row.tier = flight.status_tier;
            let texts = cell_texts(flight);
            for (cell_idx, (cell, text)) in row.cells.iter_mut().zip(texts.iter()).enumerate() {
                if cell.len() != text.chars().count() {
                    *cell = text.chars().map(FlapChar::settled).collect();
                    continue;
                }
                for (char_idx, (flap, target)) in cell.iter_mut().zip(text.chars()).enumerate() {
                    if flap.target == target && (flap.shown == target || flap.next_at.is_some()) {
                        continue;
                    }
                    let delay = ROW_DELAY * row_idx as u32
                        + CELL_DELAY * cell_idx as u32
                        + CHAR_DELAY * char_idx as u32;
                    flap.retarget(target, now + delay, row_idx + cell_idx + char_idx);
                }
            }
        }
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        let mut moving = false;
        for row in &mut self.rows {
            for cell in &mut row.cells {
                for flap in cell.iter_mut() {
                    moving |= flap.advance(now);
                }
            }
        }
        moving
    }

    pub fn is_settled(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .flatten()
            .all(|flap| flap.next_at.is_none() && flap.shown == flap.target)
    }
}

#[cfg(test)]
mod tests {
    use super::{cell_texts, flap_text, FlapBoard};
    use crate::model::{DisplayFlight, StatusTier};
    use std::time::{Duration, Instant};

    fn flight(id: &str, airport: &str, time: &str, status: &str) -> DisplayFlight {
        DisplayFlight {
            flight_id: id.to_string(),
            airport: airport.to_string(),
            time: time.to_string(),
            status: status.to_string(),
            status_tier: StatusTier::Normal,
            ..DisplayFlight::default()
        }
    }

    fn shown(board: &FlapBoard) -> Vec<[String; 4]> {
        board.rows().iter().map(|row| row.texts()).collect()
    }

    #[test]
    fn flap_text_pads_and_upcases() {
        assert_eq!(flap_text("ke123", 7), "KE123  ");
        assert_eq!(flap_text("", 5), "-    ");
        assert_eq!(flap_text("GATE CHANGED", 9), "GATE CHAN");
    }

    #[test]
    fn blank_rows_render_as_spaces() {
        let texts = cell_texts(&DisplayFlight::blank());
        assert_eq!(texts[0], " ".repeat(7));
        assert_eq!(texts[1], " ".repeat(19));
        assert_eq!(texts[3], " ".repeat(9));
    }

    #[test]
    fn first_render_is_immediate() {
        let mut board = FlapBoard::default();
        let page = vec![flight("KE1", "DANANG", "09:30", "DELAYED")];
        board.set_target(&page, Instant::now(), true);
        assert!(board.is_settled());
        assert_eq!(shown(&board)[0], cell_texts(&page[0]));
    }

    #[test]
    fn changes_flip_then_converge() {
        let start = Instant::now();
        let mut board = FlapBoard::default();
        let old = vec![
            flight("KE1", "DANANG", "09:30", "DELAYED"),
            DisplayFlight::blank(),
        ];
        let new = vec![
            flight("OZ7", "TOKYO/NARITA", "10:05", "BOARDING"),
            flight("7C2", "다낭", "11:00", "ARRIVED"),
        ];
        board.set_target(&old, start, true);
        board.set_target(&new, start, true);
        assert!(!board.is_settled());
        assert_eq!(shown(&board)[0], cell_texts(&old[0]));

        assert!(board.tick(start + Duration::from_millis(70)));
        assert_ne!(shown(&board)[0], cell_texts(&new[0]));

        board.tick(start + Duration::from_secs(5));
        assert!(board.is_settled());
        assert_eq!(shown(&board)[0], cell_texts(&new[0]));
        assert_eq!(shown(&board)[1], cell_texts(&new[1]));
    }

    #[test]
    fn retarget_mid_flip_still_converges() {
        let start = Instant::now();
        let mut board = FlapBoard::default();
        board.set_target(&[flight("AAA", "X", "00:00", "A")], start, true);
        board.set_target(&[flight("ZZZ", "Y", "11:11", "B")], start, true);
        board.tick(start + Duration::from_millis(150));
        let back = [flight("AAA", "X", "00:00", "A")];
        board.set_target(&back, start + Duration::from_millis(150), true);
        board.tick(start + Duration::from_secs(5));
        assert!(board.is_settled());
        assert_eq!(shown(&board)[0], cell_texts(&back[0]));
    }

    #[test]
    fn clear_forces_immediate_redraw() {
        let now = Instant::now();
        let mut board = FlapBoard::default();
        board.set_target(&[flight("KE1", "A", "09:30", "X")], now, true);
        board.clear();
        assert!(board.rows().is_empty());
        let page = vec![flight("OZ2", "B", "10:00", "Y"), DisplayFlight::blank()];
        board.set_target(&page, now, true);
        assert!(board.is_settled());
        assert_eq!(board.rows().len(), 2);
    }

    #[test]
    fn tier_follows_target_immediately() {
        let now = Instant::now();
        let mut board = FlapBoard::default();
        board.set_target(&[flight("KE1", "A", "09:30", "X")], now, true);
        let mut next = flight("KE1", "A", "09:30", "CANCELLED");
        next.status_tier = StatusTier::Critical;
        board.set_target(&[next], now, true);
        assert_eq!(board.rows()[0].tier, StatusTier::Critical);
    }
}
