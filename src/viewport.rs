use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clipboard;
use crate::error::{AppError, Result};
use crate::files;
use crate::loader::{DecodeRequest, DecodeTicket, DecodedImage, EntryState, PreloadCache};
use crate::media::{self, MediaRecord};
use crate::zoom::{self, Size, ZoomContext, ZoomEngine, ZoomPhase};

/// Pointer travel (per axis) before a primary press becomes a window drag.
pub const DRAG_THRESHOLD: f64 = 6.0;
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
pub const NOTICE_DURATION: Duration = Duration::from_secs(3);
/// A resize the window manager never acknowledges stops blocking zoom after this.
const RESIZE_SETTLE: Duration = Duration::from_millis(500);

/// Window operations the controller asks for.
pub trait WindowHost {
    fn monitor_bounds(&self) -> Option<Size>;
    fn is_fullscreen(&self) -> bool;
    fn exit_fullscreen(&mut self);
    /// Returns `true` when the new size is already in effect.
    fn request_resize(&mut self, size: Size) -> bool;
    fn set_always_on_top(&mut self, on_top: bool);
    fn toggle_maximize(&mut self);
    fn start_window_drag(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    NoMedia,
    Loaded,
}

/// How the render scale is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Contained in the window, following its size.
    Fit,
    /// Drawn at the zoom factor.
    Zoomed,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanOffset {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    /// Middle or secondary button: pans the image.
    Auxiliary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Armed { start: (f64, f64) },
    WindowDrag,
    ImagePan { last: (f64, f64) },
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    shown_at: Instant,
}

impl Notice {
    pub fn expires_at(&self) -> Instant {
        self.shown_at + NOTICE_DURATION
    }
}

pub struct ViewportController {
    files: Vec<PathBuf>,
    index: usize,
    media: Option<MediaRecord>,
    zoom: ZoomEngine,
    mode: ViewMode,
    pan: PanOffset,
    /// Render scale at the last sync; pan is rescaled against it.
    render_scale: Option<f64>,
    window: Size,
    geometry: Option<Size>,
    resize_started: Option<Instant>,
    cache: PreloadCache,
    pending_decodes: Vec<DecodeRequest>,
    gesture: Gesture,
    last_primary_press: Option<(Instant, (f64, f64))>,
    always_on_top: bool,
    notice: Option<Notice>,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportController {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            index: 0,
            media: None,
            zoom: ZoomEngine::new(),
            mode: ViewMode::Fit,
            pan: PanOffset::default(),
            render_scale: None,
            window: Size::default(),
            geometry: None,
            resize_started: None,
            cache: PreloadCache::new(),
            pending_decodes: Vec::new(),
            gesture: Gesture::Idle,
            last_primary_press: None,
            always_on_top: false,
            notice: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> ViewState {
        if self.media.is_some() {
            ViewState::Loaded
        } else {
            ViewState::NoMedia
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn media(&self) -> Option<&MediaRecord> {
        self.media.as_ref()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.current_zoom()
    }

    pub fn zoom_engine(&self) -> &ZoomEngine {
        &self.zoom
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn pan(&self) -> PanOffset {
        self.pan
    }

    /// Last window size the controller asked for.
    pub fn geometry(&self) -> Option<Size> {
        self.geometry
    }

    pub fn cache(&self) -> &PreloadCache {
        &self.cache
    }

    /// The decoded frame for the current item, once its decode has landed.
    pub fn current_image(&self) -> Option<Arc<DecodedImage>> {
        if self.media.is_none() {
            return None;
        }
        self.cache.ready(self.index)
    }

    /// Decodes queued by the last window shift, for the caller to dispatch.
    pub fn take_decode_requests(&mut self) -> Vec<DecodeRequest> {
        std::mem::take(&mut self.pending_decodes)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|n| n.shown_at.elapsed() < NOTICE_DURATION)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    pub fn notify(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        self.notice = Some(Notice {
            text,
            is_error: false,
            shown_at: Instant::now(),
        });
    }

    pub fn notify_error(&mut self, err: &AppError) {
        log::warn!("{} ({:?})", err, err.category());
        self.notice = Some(Notice {
            text: err.to_string(),
            is_error: true,
            shown_at: Instant::now(),
        });
    }

    // -----------------------------------------------------------------------
    // Opening and navigation
    // -----------------------------------------------------------------------

    /// Lists the folder around `path` and shows `path`. On failure nothing
    /// changes and a notice is raised.
    pub fn open_path<H: WindowHost>(&mut self, path: &Path, host: &mut H) -> Result<()> {
        let resolved = files::resolve_listing(path)
            .and_then(|(list, index)| media::load_media_info(&list[index]).map(|r| (list, index, r)));
        let (list, index, record) = match resolved {
            Ok(v) => v,
            Err(e) => {
                self.notify_error(&e);
                return Err(e);
            }
        };

        log::info!("Opened {} ({} items, index {})", path.display(), list.len(), index);
        self.cache.clear();
        self.pending_decodes.clear();
        self.files = list;
        self.index = index;
        self.show(record, host);
        Ok(())
    }

    /// Moves `delta` items with wrap-around in both directions.
    pub fn change_index<H: WindowHost>(&mut self, delta: i64, host: &mut H) {
        if self.state() == ViewState::NoMedia || self.files.is_empty() {
            return;
        }
        let len = self.files.len() as i64;
        let step = delta.rem_euclid(len);
        let target = ((self.index as i64 + step) % len) as usize;

        let record = match media::load_media_info(&self.files[target]) {
            Ok(r) => r,
            Err(e) => {
                self.notify_error(&e);
                return;
            }
        };
        log::debug!(
            "[nav] move {} -> {} (cache_hit={})",
            self.index,
            target,
            self.cache.ready(target).is_some()
        );
        self.index = target;
        self.show(record, host);
    }

    fn show<H: WindowHost>(&mut self, record: MediaRecord, host: &mut H) {
        self.zoom.reset();
        self.pan = PanOffset::default();
        self.render_scale = None;
        self.gesture = Gesture::Idle;
        self.media = Some(record);
        let requests = self.cache.update_window(self.index, &self.files);
        log::debug!("[cache] window {:?}, {} to decode", self.cache.indices(), requests.len());
        self.pending_decodes.extend(requests);
        self.reset_to_fit(host);
    }

    /// Applies a finished background decode. Returns `true` when the current
    /// item changed and needs a redraw.
    pub fn on_decode_finished(
        &mut self,
        ticket: DecodeTicket,
        result: std::result::Result<DecodedImage, String>,
    ) -> bool {
        let failure = result.as_ref().err().cloned();
        if !self.cache.complete(ticket, result) || ticket.index != self.index {
            return false;
        }
        if let (Some(msg), Some(record)) = (failure, &self.media) {
            if !record.kind.is_video() {
                self.notify_error(&AppError::Decode(msg));
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Zoom and window geometry
    // -----------------------------------------------------------------------

    fn zoom_context<H: WindowHost>(&self, host: &H) -> Option<ZoomContext> {
        let media = self.media.as_ref()?;
        Some(ZoomContext {
            image: media.resolution?,
            monitor: host.monitor_bounds()?,
            kind: media.kind,
        })
    }

    pub fn change_zoom<H: WindowHost>(&mut self, delta: i32, host: &mut H) {
        let Some(ctx) = self.zoom_context(host) else {
            return;
        };
        if self.zoom.phase() == ZoomPhase::Resizing
            && self.resize_started.is_some_and(|t| t.elapsed() > RESIZE_SETTLE)
        {
            log::debug!("[zoom] previous resize never settled, releasing guard");
            self.zoom.finish_resize();
        }
        let Some(plan) = self.zoom.step(delta, ctx) else {
            return;
        };
        log::debug!("[zoom] {} -> window {:?}", plan.zoom, plan.window);
        self.mode = ViewMode::Zoomed;
        self.resize_started = Some(Instant::now());
        self.apply_geometry(plan.window, host);
        self.sync_render_scale();
    }

    /// Sizes the window so the whole image fits the monitor, without touching
    /// the recorded zoom.
    pub fn reset_to_fit<H: WindowHost>(&mut self, host: &mut H) {
        let Some(ctx) = self.zoom_context(host) else {
            return;
        };
        let scale = zoom::fit_scale(ctx.image, ctx.monitor);
        self.mode = ViewMode::Fit;
        self.apply_geometry(zoom::window_size_for(ctx.image, scale, ctx.monitor), host);
        self.sync_render_scale();
    }

    pub fn zoom_to_actual_size<H: WindowHost>(&mut self, host: &mut H) {
        if self.state() == ViewState::NoMedia {
            return;
        }
        let Some(ctx) = self.zoom_context(host) else {
            self.zoom.reset();
            return;
        };
        let size = self.zoom.reset_to_actual_size(ctx.image, ctx.monitor);
        self.mode = ViewMode::Zoomed;
        self.apply_geometry(size, host);
        self.sync_render_scale();
    }

    /// Actual size and a centered image.
    pub fn reset_view<H: WindowHost>(&mut self, host: &mut H) {
        if self.state() == ViewState::NoMedia {
            return;
        }
        self.pan = PanOffset::default();
        self.zoom_to_actual_size(host);
    }

    fn apply_geometry<H: WindowHost>(&mut self, size: Size, host: &mut H) {
        if host.is_fullscreen() {
            host.exit_fullscreen();
        }
        self.geometry = Some(size);
        if size == self.window || host.request_resize(size) {
            self.on_window_resized(size);
        }
    }

    /// The window now has `size`, whether we asked for it or the user did.
    pub fn on_window_resized(&mut self, size: Size) {
        self.window = size;
        self.zoom.finish_resize();
        self.resize_started = None;
        self.sync_render_scale();
    }

    /// Scale the current image is drawn at.
    pub fn render_scale(&self) -> Option<f64> {
        let image = self.media.as_ref()?.resolution?;
        match self.mode {
            ViewMode::Fit if self.window.is_empty() => None,
            ViewMode::Fit => Some(zoom::contain_scale(image, self.window)),
            ViewMode::Zoomed => Some(self.zoom.current_zoom()),
        }
    }

    fn sync_render_scale(&mut self) {
        let new = self.render_scale();
        if let (Some(old), Some(new)) = (self.render_scale, new) {
            if old > 0.0 && old != new {
                let ratio = new / old;
                self.pan.x *= ratio;
                self.pan.y *= ratio;
            }
        }
        if new.is_some() {
            self.render_scale = new;
        }
    }

    // -----------------------------------------------------------------------
    // Pan and pointer gestures
    // -----------------------------------------------------------------------

    fn can_pan(&self) -> bool {
        self.media.as_ref().is_some_and(|m| !m.kind.is_video())
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if self.can_pan() {
            self.pan.x += dx;
            self.pan.y += dy;
        }
    }

    pub fn pointer_pressed<H: WindowHost>(
        &mut self,
        button: PointerButton,
        pos: (f64, f64),
        ctrl_held: bool,
        now: Instant,
        host: &mut H,
    ) {
        match button {
            PointerButton::Auxiliary => {
                if self.can_pan() {
                    self.gesture = Gesture::ImagePan { last: pos };
                }
            }
            PointerButton::Primary => {
                let double = self.last_primary_press.is_some_and(|(at, p)| {
                    now.duration_since(at) <= DOUBLE_CLICK_WINDOW
                        && (pos.0 - p.0).abs() <= DRAG_THRESHOLD
                        && (pos.1 - p.1).abs() <= DRAG_THRESHOLD
                });
                if double && !ctrl_held && self.can_pan() {
                    self.last_primary_press = None;
                    self.gesture = Gesture::Idle;
                    host.toggle_maximize();
                    return;
                }
                self.last_primary_press = Some((now, pos));
                self.gesture = Gesture::Armed { start: pos };
            }
        }
    }

    pub fn pointer_moved<H: WindowHost>(&mut self, pos: (f64, f64), host: &mut H) {
        match self.gesture {
            Gesture::Armed { start } => {
                let dx = (pos.0 - start.0).abs();
                let dy = (pos.1 - start.1).abs();
                if dx > DRAG_THRESHOLD || dy > DRAG_THRESHOLD {
                    self.gesture = Gesture::WindowDrag;
                    host.start_window_drag();
                }
            }
            Gesture::ImagePan { last } => {
                self.pan.x += pos.0 - last.0;
                self.pan.y += pos.1 - last.1;
                self.gesture = Gesture::ImagePan { last: pos };
            }
            Gesture::Idle | Gesture::WindowDrag => {}
        }
    }

    pub fn pointer_released(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// `true` while a press is being tracked as a drag or pan.
    pub fn is_dragging(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    // -----------------------------------------------------------------------
    // Window toggles and copy actions
    // -----------------------------------------------------------------------

    pub fn toggle_always_on_top<H: WindowHost>(&mut self, host: &mut H) {
        self.always_on_top = !self.always_on_top;
        host.set_always_on_top(self.always_on_top);
        let state = if self.always_on_top { "enabled" } else { "disabled" };
        self.notify(format!("Always on top: {state}"));
    }

    fn current_media(&self) -> Result<&MediaRecord> {
        self.media.as_ref().ok_or(AppError::NoMedia)
    }

    /// Copies the current file into `destination`.
    pub fn copy_to_destination(&mut self, destination: Option<&Path>) -> Result<PathBuf> {
        let result = destination
            .ok_or(AppError::NoDestination)
            .and_then(|dest| {
                let media = self.current_media()?;
                files::copy_to_destination(&media.path, dest)
            });
        match &result {
            Ok(path) => {
                let name = self.media.as_ref().map(|m| m.display_name.clone()).unwrap_or_default();
                self.notify(format!("Copied file {} to {}!", name, path.display()));
            }
            Err(e) => self.notify_error(e),
        }
        result
    }

    /// Image pixels for stills, the path for videos.
    pub fn copy_media(&mut self) -> Result<()> {
        let result = self.current_media().cloned().and_then(|media| {
            if media.kind.is_video() {
                clipboard::copy_path(&media.path)
                    .map(|_| format!("Copied {} path to clipboard", media.path.display()))
            } else {
                clipboard::copy_image(&media.path)
                    .map(|_| format!("Copied file {} to clipboard", media.display_name))
            }
        });
        self.finish_copy(result)
    }

    pub fn copy_media_path(&mut self) -> Result<()> {
        let result = self.current_media().cloned().and_then(|media| {
            clipboard::copy_path(&media.path)
                .map(|_| format!("Copied {} path to clipboard", media.path.display()))
        });
        self.finish_copy(result)
    }

    fn finish_copy(&mut self, result: Result<String>) -> Result<()> {
        match result {
            Ok(msg) => {
                self.notify(msg);
                Ok(())
            }
            Err(e) => {
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Status text
    // -----------------------------------------------------------------------

    /// Window title: item, position and zoom, plus details when `detailed`.
    pub fn status_line(&self, detailed: bool) -> String {
        let Some(media) = &self.media else {
            return "NO MEDIA - press Ctrl+O to open a file".to_string();
        };
        let mut line = format!(
            "{} [{}/{}] {:.0}%",
            media.display_name,
            self.index + 1,
            self.files.len(),
            self.zoom.current_zoom() * 100.0
        );
        if detailed {
            if let Some(res) = media.resolution {
                line.push_str(&format!(" | {}w x {}h", res.width, res.height));
            }
            line.push_str(&format!(
                " | {} | step {}/{}{} | pan x: {:.2} y: {:.2}",
                media::readable_size(media.byte_size),
                self.zoom.step_index() + 1,
                zoom::ZOOM_STEPS.len(),
                if self.zoom.is_locked() { " (max)" } else { "" },
                self.pan.x,
                self.pan.y,
            ));
            if !self.cache.is_empty() {
                line.push_str(&format!(
                    " | cache {} in {} entries, {} released",
                    media::readable_size(self.cache.current_total_bytes()),
                    self.cache.len(),
                    self.cache.released_count(),
                ));
            }
            match self.cache.get(self.index).map(|e| e.state()) {
                Some(EntryState::Pending) => line.push_str(" | decoding"),
                Some(EntryState::Failed(msg)) => line.push_str(&format!(" | failed: {msg}")),
                _ => {}
            }
            if self.always_on_top {
                line.push_str(" | on top");
            }
        }
        line
    }
}
