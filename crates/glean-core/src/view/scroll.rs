use std::time::{Duration, Instant};

pub const DEFAULT_IDLE: Duration = Duration::from_millis(150);
pub const DEFAULT_EDGE_TOLERANCE: f64 = 0.0;

/// Which edges the viewport is touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrivedState {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

/// Direction of the most recent movement on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Scroll position of a viewport over its content.
///
/// Time is passed in explicitly (`*_at`) so callers drive the idle timer.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    x: f64,
    y: f64,
    viewport: (f64, f64),
    content: (f64, f64),
    idle: Duration,
    edge_tolerance: f64,
    last_scroll: Option<Instant>,
    directions: ScrollDirections,
}

impl Default for ScrollTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            viewport: (0.0, 0.0),
            content: (0.0, 0.0),
            idle: DEFAULT_IDLE,
            edge_tolerance: DEFAULT_EDGE_TOLERANCE,
            last_scroll: None,
            directions: ScrollDirections::default(),
        }
    }

    pub fn with_edge_tolerance(mut self, tolerance: f64) -> Self {
        self.edge_tolerance = sanitize(tolerance);
        self
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (sanitize(width), sanitize(height));
    }

    pub fn set_content(&mut self, width: f64, height: f64) {
        self.content = (sanitize(width), sanitize(height));
    }

    pub fn scroll_x(&self) -> f64 {
        self.x
    }

    pub fn scroll_y(&self) -> f64 {
        self.y
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll_to_at(x, y, Instant::now());
    }

    /// Record a scroll event. Positions are clamped to the scrollable range.
    pub fn scroll_to_at(&mut self, x: f64, y: f64, now: Instant) {
        let x = sanitize(x).min(self.max_x());
        let y = sanitize(y).min(self.max_y());
        if x != self.x {
            self.directions.left = x < self.x;
            self.directions.right = x > self.x;
        }
        if y != self.y {
            self.directions.up = y < self.y;
            self.directions.down = y > self.y;
        }
        self.x = x;
        self.y = y;
        self.last_scroll = Some(now);
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling_at(Instant::now())
    }

    pub fn is_scrolling_at(&self, now: Instant) -> bool {
        self.last_scroll
            .is_some_and(|last| now.saturating_duration_since(last) < self.idle)
    }

    pub fn directions(&self) -> ScrollDirections {
        self.directions
    }

    pub fn is_scrolling_up(&self) -> bool {
        self.directions.up
    }

    pub fn is_scrolling_down(&self) -> bool {
        self.directions.down
    }

    pub fn arrived(&self) -> ArrivedState {
        let tolerance = self.edge_tolerance;
        ArrivedState {
            top: self.y <= tolerance,
            bottom: self.y + tolerance >= self.max_y(),
            left: self.x <= tolerance,
            right: self.x + tolerance >= self.max_x(),
        }
    }

    pub fn is_at_top(&self) -> bool {
        self.arrived().top
    }

    pub fn is_at_bottom(&self) -> bool {
        self.arrived().bottom
    }

    /// Vertical progress through the content, 0 at the top and 1 at the
    /// bottom (or when nothing scrolls).
    pub fn progress(&self) -> f64 {
        let max = self.max_y();
        if max <= 0.0 {
            return 1.0;
        }
        (self.y / max).clamp(0.0, 1.0)
    }

    /// Move to a fraction of the scrollable height.
    pub fn restore_progress(&mut self, progress: f64, now: Instant) {
        let fraction = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.scroll_to_at(self.x, fraction * self.max_y(), now);
    }

    fn max_x(&self) -> f64 {
        (self.content.0 - self.viewport.0).max(0.0)
    }

    fn max_y(&self) -> f64 {
        (self.content.1 - self.viewport.1).max(0.0)
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
