mod cli;
mod clipboard;
mod error;
mod files;
mod keymap;
mod loader;
mod media;
mod settings;
mod ui;
mod viewport;
mod zoom;

use clap::Parser;
use winit::event_loop::EventLoop;

use crate::cli::Cli;
use crate::loader::UserEvent;
use crate::settings::SettingsStore;
use crate::ui::App;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let settings_path = cli.settings.or_else(settings::default_path);
    if settings_path.is_none() {
        log::warn!("No config directory; settings will not be saved");
    }
    let settings = SettingsStore::open(settings_path);

    let launch = cli.path.as_deref().map(files::launch_path);
    if let Some(path) = &launch {
        log::info!("Launching with {}", path.display());
    }

    let event_loop = EventLoop::<UserEvent>::with_user_event().build().expect("create event loop");
    let proxy = event_loop.create_proxy();

    let mut app = App::new(settings, proxy, launch);

    event_loop.run_app(&mut app).expect("run event loop");
}
