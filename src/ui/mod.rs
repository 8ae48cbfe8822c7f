use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoopProxy};
use winit::keyboard::ModifiersState;
use winit::window::{Fullscreen, Window, WindowId, WindowLevel};
use softbuffer::Surface;

use crate::keymap::{self, Action, KeyRouter};
use crate::loader::{spawn_decodes, UserEvent};
use crate::media;
use crate::settings::SettingsStore;
use crate::viewport::{Notice, PointerButton, ViewportController, WindowHost};
use crate::zoom::{Size, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH};

use self::render::{Frame, Scene};

pub mod render;

// ---------------------------------------------------------------------------
// winit-backed window host
// ---------------------------------------------------------------------------

struct WinitHost<'a> {
    window: &'a Window,
}

impl WindowHost for WinitHost<'_> {
    fn monitor_bounds(&self) -> Option<Size> {
        self.window.current_monitor().map(|m| {
            let size = m.size();
            Size::new(size.width, size.height)
        })
    }

    fn is_fullscreen(&self) -> bool {
        self.window.fullscreen().is_some()
    }

    fn exit_fullscreen(&mut self) {
        self.window.set_fullscreen(None);
    }

    fn request_resize(&mut self, size: Size) -> bool {
        self.window
            .request_inner_size(PhysicalSize::new(size.width, size.height))
            .is_some()
    }

    fn set_always_on_top(&mut self, on_top: bool) {
        let level = if on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        self.window.set_window_level(level);
    }

    fn toggle_maximize(&mut self) {
        self.window.set_maximized(!self.window.is_maximized());
    }

    fn start_window_drag(&mut self) {
        if let Err(e) = self.window.drag_window() {
            log::debug!("Window drag not available: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// Application handler (winit 0.30 style)
// ---------------------------------------------------------------------------

pub struct App {
    viewport: ViewportController,
    router: KeyRouter,
    settings: SettingsStore,
    proxy: EventLoopProxy<UserEvent>,
    launch: Option<PathBuf>,
    window: Option<Arc<Window>>,
    /// Owns the display connection behind `surface`.
    _context: Option<softbuffer::Context<Arc<Window>>>,
    surface: Option<Surface<Arc<Window>, Arc<Window>>>,
    modifiers: ModifiersState,
    cursor: (f64, f64),
    settings_open: bool,
    show_info: bool,
    /// When the visible notice runs out and the title must be rebuilt.
    notice_deadline: Option<Instant>,
}

impl App {
    pub fn new(
        settings: SettingsStore,
        proxy: EventLoopProxy<UserEvent>,
        launch: Option<PathBuf>,
    ) -> Self {
        Self {
            viewport: ViewportController::new(),
            router: KeyRouter::new(keymap::default_keymaps()),
            settings,
            proxy,
            launch,
            window: None,
            _context: None,
            surface: None,
            modifiers: ModifiersState::empty(),
            cursor: (0.0, 0.0),
            settings_open: false,
            show_info: false,
            notice_deadline: None,
        }
    }

    fn open(&mut self, window: &Window, path: &Path) {
        let mut host = WinitHost { window };
        if self.viewport.open_path(path, &mut host).is_err() {
            log::warn!("Staying on the current item after failing to open {}", path.display());
        }
    }

    fn dispatch_decodes(&mut self) {
        let requests = self.viewport.take_decode_requests();
        if !requests.is_empty() {
            spawn_decodes(requests, &self.proxy);
        }
    }

    /// Rebuilds the title and asks for a new frame.
    fn refresh(&mut self, window: &Window) {
        let mut title = if self.settings_open {
            let s = self.settings.get();
            format!(
                "Settings | t: translucency {} | d: copy destination {} | esc: close",
                if s.enable_background_translucency { "on" } else { "off" },
                if s.copy_destination_folder.is_empty() {
                    "(none)"
                } else {
                    s.copy_destination_folder.as_str()
                },
            )
        } else {
            self.viewport.status_line(self.show_info)
        };
        match self.viewport.notice() {
            Some(notice) => {
                title.push_str(" - ");
                title.push_str(&notice.text);
            }
            None => title.push_str(" - peek"),
        }
        window.set_title(&title);
        self.notice_deadline = self.viewport.notice().map(Notice::expires_at);
        window.request_redraw();
    }

    fn set_settings_open(&mut self, open: bool) {
        self.settings_open = open;
        self.router.set_suspended(open);
        log::debug!("Settings overlay {}", if open { "opened" } else { "closed" });
    }

    /// Keys while the settings overlay is up. The router is suspended then.
    fn settings_key(&mut self, chord: &str) {
        if keymap::chords_equal(chord, "esc") || keymap::chords_equal(chord, "ctrl|,") {
            self.set_settings_open(false);
        } else if keymap::chords_equal(chord, "t") {
            let enabled = !self.settings.get().enable_background_translucency;
            match self.settings.set_background_translucency(enabled) {
                Ok(()) => self.viewport.notify(format!(
                    "Background translucency {}",
                    if enabled { "enabled" } else { "disabled" }
                )),
                Err(e) => self.viewport.notify_error(&e),
            }
        } else if keymap::chords_equal(chord, "d") {
            let Some(folder) = rfd::FileDialog::new()
                .set_title("Copy destination")
                .pick_folder()
            else {
                return;
            };
            match self.settings.set_copy_destination(&folder) {
                Ok(()) => self
                    .viewport
                    .notify(format!("Copy destination set to {}", folder.display())),
                Err(e) => self.viewport.notify_error(&e),
            }
        }
    }

    fn route(&mut self, chord: &str, event_loop: &ActiveEventLoop, window: &Window) {
        if self.router.is_suspended() {
            self.settings_key(chord);
            self.refresh(window);
            return;
        }
        let mut fired = None;
        self.router
            .dispatch(chord, |action, matched| fired = Some((action, matched.to_string())));
        if let Some((action, matched)) = fired {
            self.perform(action, &matched, event_loop, window);
        }
    }

    fn perform(&mut self, action: Action, chord: &str, event_loop: &ActiveEventLoop, window: &Window) {
        let mut host = WinitHost { window };
        match action {
            Action::ToggleSettings => self.set_settings_open(true),
            Action::ToggleAlwaysOnTop => self.viewport.toggle_always_on_top(&mut host),
            Action::CopyToDestination => {
                let dest = self.settings.get().copy_destination();
                let _ = self.viewport.copy_to_destination(dest.as_deref());
            }
            Action::CopyMedia => {
                let _ = self.viewport.copy_media();
            }
            Action::CopyMediaPath => {
                let _ = self.viewport.copy_media_path();
            }
            Action::PanImage => {
                let (dx, dy) = keymap::pan_delta(chord);
                self.viewport.pan_by(dx, dy);
            }
            Action::Next => self.viewport.change_index(1, &mut host),
            Action::Previous => self.viewport.change_index(-1, &mut host),
            Action::ZoomIn => self.viewport.change_zoom(1, &mut host),
            Action::ZoomOut => self.viewport.change_zoom(-1, &mut host),
            Action::ResetView => self.viewport.reset_view(&mut host),
            Action::ActualSize => self.viewport.zoom_to_actual_size(&mut host),
            Action::ToggleFullscreen => {
                if window.fullscreen().is_some() {
                    window.set_fullscreen(None);
                } else {
                    window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                }
            }
            Action::Close => {
                event_loop.exit();
                return;
            }
            Action::OpenFile => {
                let extensions = media::supported_extensions();
                let picked = rfd::FileDialog::new()
                    .add_filter("Media", extensions.as_slice())
                    .pick_file();
                if let Some(path) = picked {
                    self.open(window, &path);
                }
            }
            Action::ToggleInfo => {
                self.show_info = !self.show_info;
                if self.show_info {
                    for line in self.router.describe() {
                        log::info!("{}", line);
                    }
                }
            }
        }
        self.dispatch_decodes();
        self.refresh(window);
    }

    fn redraw(&mut self, window: &Window) {
        let size = window.inner_size();
        let fb_w = size.width.max(1);
        let fb_h = size.height.max(1);
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Err(e) = surface.resize(
            NonZeroU32::new(fb_w).unwrap_or(NonZeroU32::MIN),
            NonZeroU32::new(fb_h).unwrap_or(NonZeroU32::MIN),
        ) {
            log::warn!("Surface resize failed: {}", e);
            return;
        }

        let image = self.viewport.current_image();
        let scene = Scene {
            image: image.as_deref(),
            scale: self.viewport.render_scale(),
            pan: self.viewport.pan(),
            translucent: self.settings.get().enable_background_translucency,
            placeholder: self.viewport.media().is_some() && image.is_none(),
            settings_open: self.settings_open,
            notice: self.viewport.notice().map(|n| n.is_error),
        };
        match surface.buffer_mut() {
            Ok(mut buffer) => {
                render::draw(&mut Frame::new(&mut buffer, fb_w, fb_h), &scene);
                if let Err(e) = buffer.present() {
                    log::warn!("Present failed: {}", e);
                }
            }
            Err(e) => log::warn!("No frame buffer: {}", e),
        }
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Middle | MouseButton::Right => Some(PointerButton::Auxiliary),
        _ => None,
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("peek")
            .with_inner_size(PhysicalSize::new(800u32, 600u32))
            .with_min_inner_size(PhysicalSize::new(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT));
        let window = Arc::new(event_loop.create_window(attrs).expect("create window"));
        let context = softbuffer::Context::new(Arc::clone(&window)).expect("create context");
        let surface = Surface::new(&context, Arc::clone(&window)).expect("create surface");

        let size = window.inner_size();
        self.viewport.on_window_resized(Size::new(size.width, size.height));
        self.window = Some(Arc::clone(&window));
        self._context = Some(context);
        self.surface = Some(surface);

        if let Some(path) = self.launch.take() {
            self.open(&window, &path);
            self.dispatch_decodes();
        }
        self.refresh(&window);
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::DecodeFinished { ticket, result } => {
                if self.viewport.on_decode_finished(ticket, result) {
                    if let Some(window) = self.window.clone() {
                        self.refresh(&window);
                    }
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.viewport.on_window_resized(Size::new(width, height));
                self.refresh(&window);
            }

            WindowEvent::ModifiersChanged(mods) => {
                self.modifiers = mods.state();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if let Some(chord) = keymap::key_chord(&event.logical_key, self.modifiers) {
                    self.route(&chord, event_loop, &window);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => y as f32 / 40.0,
                };
                if let Some(chord) = keymap::wheel_chord(y, self.modifiers) {
                    self.route(&chord, event_loop, &window);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if self.settings_open {
                    return;
                }
                let Some(button) = pointer_button(button) else {
                    return;
                };
                match state {
                    ElementState::Pressed => {
                        let mut host = WinitHost { window: &window };
                        self.viewport.pointer_pressed(
                            button,
                            self.cursor,
                            self.modifiers.control_key(),
                            Instant::now(),
                            &mut host,
                        );
                    }
                    ElementState::Released => self.viewport.pointer_released(),
                }
            }

            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                self.cursor = (x, y);
                if self.viewport.is_dragging() {
                    let mut host = WinitHost { window: &window };
                    self.viewport.pointer_moved((x, y), &mut host);
                    window.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => self.redraw(&window),

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        match self.notice_deadline {
            Some(when) if Instant::now() >= when => {
                self.notice_deadline = None;
                if let Some(window) = self.window.clone() {
                    self.refresh(&window);
                }
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            Some(when) => event_loop.set_control_flow(ControlFlow::WaitUntil(when)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}
