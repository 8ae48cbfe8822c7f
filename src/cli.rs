use clap::Parser;
use std::path::PathBuf;

pub const HELP_KEYS: &str = "\
Key Bindings:
  Right / h / Wheel up        : Next item
  Left / l / Wheel down       : Previous item
  = / + / k / Up / Ctrl+Wheel : Zoom in
  - / j / Down / Ctrl+Wheel   : Zoom out
  Esc / r / o                 : Reset zoom and pan
  1                           : Zoom to actual size
  Ctrl+h/l/j/k                : Pan image
  f                           : Toggle fullscreen
  i                           : Toggle info in title
  Ctrl+o                      : Open file
  Ctrl+s                      : Copy file to destination folder
  Ctrl+c / Ctrl+Shift+c       : Copy media / copy path
  Ctrl+t                      : Always on top
  Ctrl+,                      : Settings (t: translucency, d: destination)
  x                           : Close
";

#[derive(Parser)]
#[command(name = "peek", about = "A single-item media viewer", after_help = HELP_KEYS)]
pub struct Cli {
    /// File or folder to open. `file://` URLs are accepted.
    pub path: Option<String>,

    /// Settings file to use instead of the one in the config directory
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,
}
