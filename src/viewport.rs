use std::time::{Duration, Instant};

pub const MOBILE_BREAKPOINT_PX: u32 = 768;
pub const MOBILE_ROWS: usize = 4;
pub const MIN_ROWS: usize = 4;
const HEADER_ALLOWANCE_PX: f64 = 250.0;
const MIN_ROW_HEIGHT_PX: f64 = 60.0;
const ROW_HEIGHT_RATIO: f64 = 0.06;

// (minimum viewport height, maximum rows); first matching tier applies.
const HEIGHT_TIERS: &[(u32, usize)] = &[(2160, 14), (1440, 10), (1080, 8), (900, 6)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn from_terminal(
        columns: u16,
        rows: u16,
        pixels: Option<(u16, u16)>,
        cell_px: (u16, u16),
    ) -> Self {
        match pixels {
            Some((width, height)) if width > 0 && height > 0 => Self {
                width: u32::from(width),
                height: u32::from(height),
            },
            _ => Self {
                width: u32::from(columns) * u32::from(cell_px.0.max(1)),
                height: u32::from(rows) * u32::from(cell_px.1.max(1)),
            },
        }
    }

    pub fn rows_per_page(&self) -> usize {
        compute_rows_per_page(self.width, self.height)
    }
}

pub fn compute_rows_per_page(width: u32, height: u32) -> usize {
    if width < MOBILE_BREAKPOINT_PX {
        return MOBILE_ROWS;
    }

    let height_px = f64::from(height);
    let row_height = MIN_ROW_HEIGHT_PX.max(height_px * ROW_HEIGHT_RATIO);
    let available = (height_px - HEADER_ALLOWANCE_PX).max(0.0);
    let candidate = (available / row_height).floor() as usize;

    let capped = HEIGHT_TIERS
        .iter()
        .find(|(min_height, _)| height >= *min_height)
        .map(|(_, max_rows)| candidate.min(*max_rows))
        .unwrap_or(candidate);
    capped.max(MIN_ROWS)
}

// Holds the latest resize until no further resize arrived for `settle`.
#[derive(Clone, Debug)]
pub struct ResizeDebouncer {
    settle: Duration,
    pending: Option<(Viewport, Instant)>,
}

impl ResizeDebouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending: None,
        }
    }

    pub fn observe(&mut self, viewport: Viewport, now: Instant) {
        self.pending = Some((viewport, now));
    }

    pub fn poll(&mut self, now: Instant) -> Option<Viewport> {
        let (viewport, at) = self.pending?;
        if now.saturating_duration_since(at) >= self.settle {
            self.pending = None;
            Some(viewport)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_rows_per_page, ResizeDebouncer, Viewport};
    use std::time::{Duration, Instant};

    #[test]
    fn narrow_viewports_use_mobile_rows() {
        assert_eq!(compute_rows_per_page(767, 2160), 4);
        assert_eq!(compute_rows_per_page(320, 400), 4);
    }

    #[test]
    fn height_tiers_cap_rows() {
        assert_eq!(compute_rows_per_page(3840, 2160), 14);
        assert_eq!(compute_rows_per_page(2560, 1440), 10);
        assert_eq!(compute_rows_per_page(1920, 1080), 8);
        assert_eq!(compute_rows_per_page(1600, 900), 6);
        assert_eq!(compute_rows_per_page(1366, 768), 8);
    }

    #[test]
    fn short_viewports_keep_four_rows() {
        assert_eq!(compute_rows_per_page(1024, 300), 4);
        assert_eq!(compute_rows_per_page(1024, 100), 4);
        assert_eq!(compute_rows_per_page(1024, 0), 4);
    }

    #[test]
    fn terminal_cells_scale_when_pixels_unknown() {
        let vp = Viewport::from_terminal(200, 60, None, (9, 18));
        assert_eq!(vp, Viewport { width: 1800, height: 1080 });
        assert_eq!(vp.rows_per_page(), 8);

        let vp = Viewport::from_terminal(200, 60, Some((0, 0)), (9, 18));
        assert_eq!(vp.width, 1800);

        let vp = Viewport::from_terminal(80, 24, Some((2560, 1440)), (9, 18));
        assert_eq!(vp.rows_per_page(), 10);
    }

    #[test]
    fn debouncer_waits_for_quiet_period() {
        let start = Instant::now();
        let settle = Duration::from_millis(500);
        let mut debouncer = ResizeDebouncer::new(settle);
        assert!(debouncer.poll(start).is_none());

        let first = Viewport { width: 1000, height: 800 };
        let second = Viewport { width: 1920, height: 1080 };
        debouncer.observe(first, start);
        debouncer.observe(second, start + Duration::from_millis(300));
        assert!(debouncer.poll(start + Duration::from_millis(600)).is_none());
        assert_eq!(debouncer.poll(start + Duration::from_millis(800)), Some(second));
        assert!(debouncer.poll(start + Duration::from_millis(2000)).is_none());
    }
}
