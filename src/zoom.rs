use crate::media::MediaKind;

/// Allowed zoom factors, ascending. Zoom always snaps to one of these.
pub const ZOOM_STEPS: [f64; 19] = [
    0.05, 0.1, 0.15, 0.25, 0.33, 0.5, 0.67, 0.75, 1.0, 1.25, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0,
    8.0, 10.0,
];

/// Index of the `1.0` entry in [`ZOOM_STEPS`].
pub const ACTUAL_SIZE_STEP: usize = 8;

const STEP_MATCH_TOLERANCE: f64 = 0.01;

pub const MIN_WINDOW_WIDTH: u32 = 200;
pub const MIN_WINDOW_HEIGHT: u32 = 150;
const MIN_WINDOW_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Window size for showing an image of `image` pixels at `zoom`.
///
/// The result is at least `max(200, 5% of width)` by `max(150, 5% of height)`
/// and never larger than the monitor.
pub fn window_size_for(image: Size, zoom: f64, monitor: Size) -> Size {
    let mut width = (image.width as f64 * zoom).floor() as u32;
    let mut height = (image.height as f64 * zoom).floor() as u32;

    let min_width = MIN_WINDOW_WIDTH.max((image.width as f64 * MIN_WINDOW_FRACTION).floor() as u32);
    let min_height =
        MIN_WINDOW_HEIGHT.max((image.height as f64 * MIN_WINDOW_FRACTION).floor() as u32);
    width = width.max(min_width);
    height = height.max(min_height);

    if width >= monitor.width {
        width = monitor.width;
    }
    if height >= monitor.height {
        height = monitor.height;
    }
    Size::new(width, height)
}

/// Largest scale (capped at 1) at which `image` fits inside `monitor`.
pub fn fit_scale(image: Size, monitor: Size) -> f64 {
    if image.is_empty() {
        return 1.0;
    }
    let sx = monitor.width as f64 / image.width as f64;
    let sy = monitor.height as f64 / image.height as f64;
    1.0f64.min(sx).min(sy)
}

/// Scale at which `image` is drawn contained in `window` (may exceed 1).
pub fn contain_scale(image: Size, window: Size) -> f64 {
    if image.is_empty() {
        return 1.0;
    }
    (window.width as f64 / image.width as f64).min(window.height as f64 / image.height as f64)
}

/// Index of the step matching `zoom`: an entry within 0.01, else the closest.
pub fn nearest_step(zoom: f64) -> usize {
    if let Some(i) = ZOOM_STEPS
        .iter()
        .position(|s| (s - zoom).abs() < STEP_MATCH_TOLERANCE)
    {
        return i;
    }
    let mut closest = 0;
    for (i, step) in ZOOM_STEPS.iter().enumerate() {
        if (step - zoom).abs() < (ZOOM_STEPS[closest] - zoom).abs() {
            closest = i;
        }
    }
    closest
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomPhase {
    Idle,
    /// A resize was requested and the window has not reported back yet.
    Resizing,
}

/// Result of a committed zoom step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomPlan {
    pub zoom: f64,
    pub window: Size,
}

/// What a zoom request needs to know about the current media and screen.
#[derive(Debug, Clone, Copy)]
pub struct ZoomContext {
    pub image: Size,
    pub monitor: Size,
    pub kind: MediaKind,
}

#[derive(Debug, Clone)]
pub struct ZoomEngine {
    zoom: f64,
    phase: ZoomPhase,
    /// Set once a video reaches the monitor size while zooming in.
    locked: bool,
}

impl Default for ZoomEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoomEngine {
    pub fn new() -> Self {
        Self {
            zoom: ZOOM_STEPS[ACTUAL_SIZE_STEP],
            phase: ZoomPhase::Idle,
            locked: false,
        }
    }

    pub fn current_zoom(&self) -> f64 {
        self.zoom
    }

    pub fn step_index(&self) -> usize {
        nearest_step(self.zoom)
    }

    pub fn phase(&self) -> ZoomPhase {
        self.phase
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Overrides the tracked zoom without touching the step table.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    /// Moves one step in the direction of `delta` and returns the new zoom
    /// and window size, or `None` when nothing should change.
    ///
    /// A returned plan leaves the engine in [`ZoomPhase::Resizing`] until
    /// [`ZoomEngine::finish_resize`] is called.
    pub fn step(&mut self, delta: i32, ctx: ZoomContext) -> Option<ZoomPlan> {
        if delta == 0 || (delta > 0 && self.locked) || self.phase == ZoomPhase::Resizing {
            return None;
        }

        let current = nearest_step(self.zoom) as i64;
        let target = (current + delta.signum() as i64).clamp(0, ZOOM_STEPS.len() as i64 - 1);
        let zoom = ZOOM_STEPS[target as usize];
        if zoom == self.zoom {
            return None;
        }

        let prospective_w = (ctx.image.width as f64 * zoom).floor() as u32;
        let prospective_h = (ctx.image.height as f64 * zoom).floor() as u32;
        let reaches_monitor =
            prospective_w >= ctx.monitor.width || prospective_h >= ctx.monitor.height;
        if delta > 0 && reaches_monitor && ctx.kind.is_video() {
            log::debug!("Locking zoom-in: video reached monitor size at {zoom}");
            self.locked = true;
        }

        self.zoom = zoom;
        self.phase = ZoomPhase::Resizing;
        Some(ZoomPlan {
            zoom,
            window: window_size_for(ctx.image, zoom, ctx.monitor),
        })
    }

    pub fn finish_resize(&mut self) {
        self.phase = ZoomPhase::Idle;
    }

    /// Snaps to exactly 1.0, clearing the lock and any in-flight resize.
    pub fn reset_to_actual_size(&mut self, image: Size, monitor: Size) -> Size {
        self.reset();
        window_size_for(image, self.zoom, monitor)
    }

    /// Back to defaults, as after navigating to another item.
    pub fn reset(&mut self) {
        self.zoom = ZOOM_STEPS[ACTUAL_SIZE_STEP];
        self.locked = false;
        self.phase = ZoomPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONITOR: Size = Size::new(1920, 1080);

    fn image_ctx(w: u32, h: u32) -> ZoomContext {
        ZoomContext {
            image: Size::new(w, h),
            monitor: MONITOR,
            kind: MediaKind::Image,
        }
    }

    /// Runs one zoom step and acknowledges the resize like a window would.
    fn step(engine: &mut ZoomEngine, delta: i32, ctx: ZoomContext) -> Option<ZoomPlan> {
        let plan = engine.step(delta, ctx);
        engine.finish_resize();
        plan
    }

    #[test]
    fn step_table_is_ascending_and_holds_actual_size() {
        assert!(ZOOM_STEPS.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ZOOM_STEPS[ACTUAL_SIZE_STEP], 1.0);
        assert_eq!(ZOOM_STEPS[0], 0.05);
        assert_eq!(ZOOM_STEPS[18], 10.0);
    }

    #[test]
    fn oversized_image_clamps_to_monitor() {
        assert_eq!(window_size_for(Size::new(4000, 3000), 1.0, MONITOR), MONITOR);
    }

    #[test]
    fn tiny_window_is_raised_to_minimum() {
        assert_eq!(
            window_size_for(Size::new(400, 300), 0.05, MONITOR),
            Size::new(200, 150)
        );
    }

    #[test]
    fn minimum_scales_with_huge_images() {
        let size = window_size_for(Size::new(10000, 8000), 0.01, Size::new(5000, 5000));
        assert_eq!(size, Size::new(500, 400));
    }

    #[test]
    fn single_axis_clamp() {
        assert_eq!(
            window_size_for(Size::new(3000, 500), 1.0, MONITOR),
            Size::new(1920, 500)
        );
    }

    #[test]
    fn fit_scale_never_exceeds_one() {
        assert_eq!(fit_scale(Size::new(100, 100), MONITOR), 1.0);
        assert_eq!(fit_scale(Size::new(3840, 1080), MONITOR), 0.5);
        assert_eq!(fit_scale(Size::new(1920, 2160), MONITOR), 0.5);
    }

    #[test]
    fn nearest_step_matches_within_tolerance_then_by_distance() {
        assert_eq!(nearest_step(1.0), 8);
        assert_eq!(nearest_step(0.335), 4);
        assert_eq!(nearest_step(0.9), 8);
        assert_eq!(nearest_step(7.1), 17);
        assert_eq!(nearest_step(50.0), 18);
        assert_eq!(nearest_step(0.0), 0);
    }

    #[test]
    fn stepping_is_idempotent_at_the_bounds() {
        let ctx = image_ctx(100, 100);
        let mut engine = ZoomEngine::new();
        engine.set_zoom(ZOOM_STEPS[0]);
        assert_eq!(step(&mut engine, -1, ctx), None);
        assert_eq!(engine.current_zoom(), 0.05);

        engine.set_zoom(ZOOM_STEPS[18]);
        assert_eq!(step(&mut engine, 1, ctx), None);
        assert_eq!(engine.current_zoom(), 10.0);
    }

    #[test]
    fn stepping_walks_the_table() {
        let ctx = image_ctx(100, 100);
        let mut engine = ZoomEngine::new();
        let plan = step(&mut engine, 1, ctx).expect("zoom in");
        assert_eq!(plan.zoom, 1.25);
        assert_eq!(engine.step_index(), 9);

        step(&mut engine, -1, ctx);
        step(&mut engine, -1, ctx);
        assert_eq!(engine.current_zoom(), 0.75);
    }

    #[test]
    fn off_table_zoom_snaps_from_nearest_entry() {
        let ctx = image_ctx(100, 100);
        let mut engine = ZoomEngine::new();
        engine.set_zoom(0.62);
        let plan = step(&mut engine, 1, ctx).expect("zoom in");
        assert_eq!(plan.zoom, 0.75);
    }

    #[test]
    fn requests_are_dropped_while_resizing() {
        let ctx = image_ctx(100, 100);
        let mut engine = ZoomEngine::new();
        assert!(engine.step(1, ctx).is_some());
        assert_eq!(engine.phase(), ZoomPhase::Resizing);
        assert!(engine.step(1, ctx).is_none());
        assert_eq!(engine.current_zoom(), 1.25);

        engine.finish_resize();
        assert!(engine.step(1, ctx).is_some());
        assert_eq!(engine.current_zoom(), 1.5);
    }

    #[test]
    fn video_locks_once_it_reaches_the_monitor() {
        let ctx = ZoomContext {
            image: Size::new(1280, 720),
            monitor: MONITOR,
            kind: MediaKind::Video,
        };
        let mut engine = ZoomEngine::new();
        let plan = step(&mut engine, 1, ctx).expect("1.25");
        assert!(!engine.is_locked());
        assert_eq!(plan.window, Size::new(1600, 900));

        let plan = step(&mut engine, 1, ctx).expect("1.5");
        assert!(engine.is_locked());
        assert_eq!(plan.window, MONITOR);

        assert_eq!(step(&mut engine, 1, ctx), None);
        assert!(step(&mut engine, -1, ctx).is_some());

        engine.reset_to_actual_size(ctx.image, ctx.monitor);
        assert!(!engine.is_locked());
        assert!(step(&mut engine, 1, ctx).is_some());
    }

    #[test]
    fn still_images_never_lock() {
        let ctx = image_ctx(1280, 720);
        let mut engine = ZoomEngine::new();
        for _ in 0..10 {
            step(&mut engine, 1, ctx);
        }
        assert!(!engine.is_locked());
        assert_eq!(engine.current_zoom(), 10.0);
    }

    #[test]
    fn actual_size_clears_in_flight_resize() {
        let ctx = image_ctx(800, 600);
        let mut engine = ZoomEngine::new();
        engine.step(1, ctx);
        let window = engine.reset_to_actual_size(ctx.image, ctx.monitor);
        assert_eq!(window, Size::new(800, 600));
        assert_eq!(engine.phase(), ZoomPhase::Idle);
        assert_eq!(engine.current_zoom(), 1.0);
    }
}
