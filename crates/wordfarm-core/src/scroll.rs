//! Sticky auto-scroll: keep live viewers pinned to the newest post without
//! yanking a reader who scrolled up into the history.

/// Default distance from the bottom that still counts as "at the bottom".
pub const SCROLL_TOLERANCE: f64 = 4.0;

/// Scroll geometry of the feed container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Distance scrolled from the top.
    pub scroll_offset: f64,
    /// Visible height.
    pub viewport_height: f64,
    /// Full height of the rendered content.
    pub content_height: f64,
}

impl Viewport {
    pub fn new(scroll_offset: f64, viewport_height: f64, content_height: f64) -> Self {
        Self {
            scroll_offset,
            viewport_height,
            content_height,
        }
    }

    /// Largest valid scroll offset.
    pub fn scrollable_extent(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    pub fn is_at_bottom(&self, tolerance: f64) -> bool {
        self.scrollable_extent() - self.scroll_offset <= tolerance
    }

    /// The same viewport scrolled all the way down.
    pub fn scrolled_to_bottom(&self) -> Self {
        Self {
            scroll_offset: self.scrollable_extent(),
            ..*self
        }
    }
}

/// Taken before a snapshot's output is rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollCapture {
    pub was_at_bottom: bool,
    pub content_height: f64,
}

#[derive(Debug, Clone)]
pub struct ScrollAnchor {
    tolerance: f64,
    seen_first_snapshot: bool,
}

impl Default for ScrollAnchor {
    fn default() -> Self {
        Self::new(SCROLL_TOLERANCE)
    }
}

impl ScrollAnchor {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            seen_first_snapshot: false,
        }
    }

    /// Record where the viewport is, before rendering.
    pub fn capture(&self, viewport: &Viewport) -> ScrollCapture {
        ScrollCapture {
            was_at_bottom: viewport.is_at_bottom(self.tolerance),
            content_height: viewport.content_height,
        }
    }

    /// Decide, after rendering, whether to jump to the bottom. The first
    /// decision of a session always jumps.
    pub fn should_auto_scroll(&mut self, capture: ScrollCapture, rendered: &Viewport) -> bool {
        if !self.seen_first_snapshot {
            self.seen_first_snapshot = true;
            return true;
        }
        capture.was_at_bottom && rendered.content_height > capture.content_height
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
