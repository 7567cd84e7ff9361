// Interactive drag-to-resize for widgets inside a section grid.
//
// A gesture is a small state machine: Idle -> Dragging -> Idle. Pointer
// listeners registered when the drag starts are held by a `Subscription`
// and released when the gesture ends, whichever way it ends.
use super::layout::{SectionGrid, clamp_columns};

/// Pointer listener registration. Dropping it detaches the listeners.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn detached() -> Self {
        Self { release: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Pixel geometry of the grid the gesture happens on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub grid_width_px: f64,
    pub gap_px: f64,
    pub columns: u8,
}

impl GridMetrics {
    pub fn cell_width(&self) -> f64 {
        let columns = f64::from(clamp_columns(self.columns));
        (self.grid_width_px - (columns - 1.0) * self.gap_px) / columns
    }
}

/// Width after moving the pointer from `start_x` to `pointer_x`, clamped to
/// `1..=max_width`.
pub fn resized_width(
    start_x: f64,
    pointer_x: f64,
    start_width: u8,
    max_width: u8,
    metrics: &GridMetrics,
) -> u8 {
    let cell = metrics.cell_width();
    let delta = if cell > 0.0 && cell.is_finite() {
        ((pointer_x - start_x) / cell).round()
    } else {
        0.0
    };
    // NaN pointer coordinates must not collapse the width to 0
    let delta = if delta.is_finite() { delta } else { 0.0 };
    let max = f64::from(max_width.max(1));
    (f64::from(start_width) + delta).clamp(1.0, max) as u8
}

#[derive(Debug)]
pub struct DragOrigin {
    pub widget_id: String,
    pub start_x: f64,
    pub start_width: u8,
    /// Captured once when the drag starts.
    pub max_width: u8,
    _listeners: Subscription,
}

#[derive(Debug, Default)]
pub enum ResizeState {
    #[default]
    Idle,
    Dragging(DragOrigin),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeUpdate {
    pub widget_id: String,
    pub width: u8,
}

#[derive(Debug, Default)]
pub struct ResizeGesture {
    state: ResizeState,
}

impl ResizeGesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ResizeState::Dragging(_))
    }

    pub fn state(&self) -> &ResizeState {
        &self.state
    }

    /// Start dragging widget `index` of `grid`. A gesture still in flight is
    /// ended first, releasing its listeners. Returns false when `index` is
    /// out of range; the subscription is released immediately in that case.
    pub fn begin(
        &mut self,
        widget_id: &str,
        index: usize,
        grid: &SectionGrid,
        pointer_x: f64,
        listeners: Subscription,
    ) -> bool {
        self.state = ResizeState::Idle;
        let (Some(&start_width), Some(max_width)) =
            (grid.widths().get(index), grid.max_width_at(index))
        else {
            return false;
        };
        tracing::debug!(widget_id, start_width, max_width, "resize started");
        self.state = ResizeState::Dragging(DragOrigin {
            widget_id: widget_id.to_string(),
            start_x: pointer_x,
            start_width,
            max_width,
            _listeners: listeners,
        });
        true
    }

    /// Live preview width for the current pointer position.
    pub fn pointer_move(&self, pointer_x: f64, metrics: &GridMetrics) -> Option<ResizeUpdate> {
        match &self.state {
            ResizeState::Idle => None,
            ResizeState::Dragging(origin) => Some(ResizeUpdate {
                widget_id: origin.widget_id.clone(),
                width: resized_width(
                    origin.start_x,
                    pointer_x,
                    origin.start_width,
                    origin.max_width,
                    metrics,
                ),
            }),
        }
    }

    /// Pointer released anywhere in the document: emit the final width and
    /// go back to idle, dropping the listener subscription.
    pub fn pointer_up(&mut self, pointer_x: f64, metrics: &GridMetrics) -> Option<ResizeUpdate> {
        let update = self.pointer_move(pointer_x, metrics);
        self.state = ResizeState::Idle;
        update
    }
}
