use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::files;
use crate::zoom::Size;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff"];
const ANIMATED_EXTENSIONS: &[&str] = &["gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    AnimatedImage,
    Video,
}

impl MediaKind {
    /// Classifies a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Image)
        } else if ANIMATED_EXTENSIONS.contains(&ext) {
            Some(MediaKind::AnimatedImage)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn is_video(self) -> bool {
        self == MediaKind::Video
    }
}

/// Every extension we open, for file dialog filters.
pub fn supported_extensions() -> Vec<&'static str> {
    [IMAGE_EXTENSIONS, ANIMATED_EXTENSIONS, VIDEO_EXTENSIONS].concat()
}

pub fn is_media_file(path: &Path) -> bool {
    MediaKind::from_path(path).is_some()
}

/// The file currently shown by the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRecord {
    pub path: PathBuf,
    pub display_name: String,
    pub byte_size: u64,
    /// Native pixel size. `None` when the header could not be read.
    pub resolution: Option<Size>,
    pub kind: MediaKind,
}

/// Resolves one path into a [`MediaRecord`].
///
/// Fails when the file is unreadable or of an unsupported type. A header we
/// cannot parse only leaves the resolution unknown.
pub fn load_media_info(path: &Path) -> Result<MediaRecord> {
    let kind = MediaKind::from_path(path).ok_or_else(|| AppError::Unsupported(path.to_path_buf()))?;
    let byte_size = files::file_size(path)?;
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let probed = match kind {
        MediaKind::Video => probe_video_resolution(path),
        MediaKind::Image | MediaKind::AnimatedImage => probe_resolution(path),
    };
    let resolution = match probed {
        Ok(size) => Some(size),
        Err(e) => {
            log::warn!("Could not read dimensions of {}: {}", path.display(), e);
            None
        }
    };

    Ok(MediaRecord {
        path: path.to_path_buf(),
        display_name,
        byte_size,
        resolution,
        kind,
    })
}

fn probe_resolution(path: &Path) -> Result<Size> {
    let (width, height) = image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(Size::new(width, height))
}

/// Frame size of the first video track, read from the container header.
fn probe_video_resolution(path: &Path) -> Result<Size> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let size = match ext.as_str() {
        "mp4" | "mov" => probe_mp4(path)?,
        "mkv" | "webm" => probe_matroska(path)?,
        _ => None,
    };
    size.filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Decode(format!("{}: no video track size", path.display())))
}

fn probe_mp4(path: &Path) -> Result<Option<Size>> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let reader = mp4::Mp4Reader::read_header(BufReader::new(file), len)
        .map_err(|e| AppError::Decode(format!("{}: {}", path.display(), e)))?;
    Ok(reader
        .tracks()
        .values()
        .find(|t| matches!(t.track_type(), Ok(mp4::TrackType::Video)))
        .map(|t| Size::new(t.width() as u32, t.height() as u32)))
}

fn probe_matroska(path: &Path) -> Result<Option<Size>> {
    let mkv = matroska::Matroska::open(File::open(path)?)
        .map_err(|e| AppError::Decode(format!("{}: {}", path.display(), e)))?;
    Ok(mkv.tracks.iter().find_map(|t| match &t.settings {
        matroska::Settings::Video(v) => Some(Size::new(
            u32::try_from(v.pixel_width).unwrap_or(u32::MAX),
            u32::try_from(v.pixel_height).unwrap_or(u32::MAX),
        )),
        _ => None,
    }))
}

/// Formats a byte count with binary units and two decimals, e.g. `1.5 MB`.
pub fn readable_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Writes a header-only MP4 with one video track of the given size.
#[cfg(test)]
pub(crate) fn write_test_mp4(path: &Path, width: u16, height: u16) {
    let file = File::create(path).expect("create mp4");
    let config = mp4::Mp4Config {
        major_brand: "isom".parse().expect("brand"),
        minor_version: 512,
        compatible_brands: vec!["isom".parse().expect("brand"), "avc1".parse().expect("brand")],
        timescale: 1000,
    };
    let mut writer = mp4::Mp4Writer::write_start(file, &config).expect("start mp4");
    writer
        .add_track(&mp4::TrackConfig {
            track_type: mp4::TrackType::Video,
            timescale: 1000,
            language: "und".to_string(),
            media_conf: mp4::MediaConfig::AvcConfig(mp4::AvcConfig {
                width,
                height,
                seq_param_set: vec![0x67, 0x64, 0x00, 0x1f],
                pic_param_set: vec![0x68, 0xeb, 0xe3, 0xcb],
            }),
        })
        .expect("add track");
    writer.write_end().expect("finish mp4");
}
