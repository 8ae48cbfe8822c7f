use image::GenericImageView;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use winit::event_loop::EventLoopProxy;

use crate::media::MediaKind;

/// Entries kept on each side of the current index.
pub const PRELOAD_RADIUS: usize = 2;
pub const MAX_ENTRIES: usize = PRELOAD_RADIUS * 2 + 1;

// ---------------------------------------------------------------------------
// Decoded image data (CPU side)
// ---------------------------------------------------------------------------

pub struct DecodedImage {
    pub rgba_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl DecodedImage {
    pub fn mem_size(&self) -> u64 {
        self.rgba_bytes.len() as u64
    }
}

pub fn decode_image(path: &Path) -> Result<DecodedImage, String> {
    if MediaKind::from_path(path).is_some_and(MediaKind::is_video) {
        return Err(format!("{}: videos are not decoded", path.display()));
    }
    let img = image::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let (width, height) = img.dimensions();
    Ok(DecodedImage {
        rgba_bytes: img.into_rgba8().into_raw(),
        width,
        height,
    })
}

// ---------------------------------------------------------------------------
// Cache entries
// ---------------------------------------------------------------------------

/// Identifies one decode job. A completion only lands on the entry that
/// issued it: same index and same generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket {
    pub index: usize,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodeRequest {
    pub ticket: DecodeTicket,
    pub path: PathBuf,
}

pub enum EntryState {
    Pending,
    Ready(Arc<DecodedImage>),
    Failed(String),
    /// Dropped out of the window; the handle has been let go.
    Released,
}

pub struct CacheEntry {
    pub index: usize,
    pub path: PathBuf,
    generation: u64,
    state: EntryState,
    /// Unknown until the decode completes.
    pub decoded_bytes: Option<u64>,
}

impl CacheEntry {
    pub fn state(&self) -> &EntryState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, EntryState::Failed(_))
    }

    fn invalidate(&mut self) {
        self.state = EntryState::Released;
        self.decoded_bytes = None;
    }
}

// ---------------------------------------------------------------------------
// Preload cache
// ---------------------------------------------------------------------------

/// Sliding window of decoded neighbours around the current index.
///
/// Indices held are always the contiguous range
/// `[target - 2, target + 2]` clipped to the list bounds.
#[derive(Default)]
pub struct PreloadCache {
    entries: BTreeMap<usize, CacheEntry>,
    next_generation: u64,
    released: u64,
}

/// Inclusive index range covered by the window around `target`.
pub fn window_bounds(target: usize, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let target = target.min(len - 1);
    let start = target.saturating_sub(PRELOAD_RADIUS);
    let end = (target + PRELOAD_RADIUS).min(len - 1);
    Some((start, end))
}

impl PreloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts the window to `target`: keeps entries still in range, creates
    /// the missing ones and releases the rest. Returns the decodes to start.
    pub fn update_window(&mut self, target: usize, files: &[PathBuf]) -> Vec<DecodeRequest> {
        let Some((start, end)) = window_bounds(target, files.len()) else {
            self.clear();
            return Vec::new();
        };

        let stale: Vec<usize> = self
            .entries
            .keys()
            .copied()
            .filter(|&i| i < start || i > end)
            .collect();
        for idx in stale {
            self.release(idx);
        }

        let mut requests = Vec::new();
        for idx in start..=end {
            if self.entries.contains_key(&idx) {
                log::debug!("[cache] keep {}", idx);
                continue;
            }
            self.next_generation += 1;
            let ticket = DecodeTicket {
                index: idx,
                generation: self.next_generation,
            };
            self.entries.insert(
                idx,
                CacheEntry {
                    index: idx,
                    path: files[idx].clone(),
                    generation: ticket.generation,
                    state: EntryState::Pending,
                    decoded_bytes: None,
                },
            );
            requests.push(DecodeRequest {
                ticket,
                path: files[idx].clone(),
            });
        }
        debug_assert!(self.entries.len() <= MAX_ENTRIES);
        requests
    }

    fn release(&mut self, idx: usize) {
        if let Some(mut entry) = self.entries.remove(&idx) {
            entry.invalidate();
            self.released += 1;
            log::debug!("[cache] release {}", idx);
        }
    }

    /// Releases every entry, as when a new folder is opened.
    pub fn clear(&mut self) {
        let all: Vec<usize> = self.entries.keys().copied().collect();
        for idx in all {
            self.release(idx);
        }
    }

    /// Applies a finished decode. Returns `false` when the result was
    /// discarded because its entry has since left the window.
    pub fn complete(&mut self, ticket: DecodeTicket, result: Result<DecodedImage, String>) -> bool {
        let Some(entry) = self.entries.get_mut(&ticket.index) else {
            log::debug!("[cache] discard result for {} (out of window)", ticket.index);
            return false;
        };
        if entry.generation != ticket.generation || !entry.is_pending() {
            log::debug!("[cache] discard stale result for {}", ticket.index);
            return false;
        }
        match result {
            Ok(decoded) => {
                entry.decoded_bytes = Some(decoded.mem_size());
                entry.state = EntryState::Ready(Arc::new(decoded));
            }
            Err(e) => {
                log::warn!("[cache] decode failed for {}: {}", ticket.index, e);
                entry.state = EntryState::Failed(e);
            }
        }
        true
    }

    pub fn get(&self, idx: usize) -> Option<&CacheEntry> {
        self.entries.get(&idx)
    }

    /// The decoded image for `idx`, if its decode has completed.
    pub fn ready(&self, idx: usize) -> Option<Arc<DecodedImage>> {
        match self.entries.get(&idx).map(|e| &e.state) {
            Some(EntryState::Ready(img)) => Some(Arc::clone(img)),
            _ => None,
        }
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total entries invalidated since creation.
    pub fn released_count(&self) -> u64 {
        self.released
    }

    /// Sum of known decoded sizes. Pending and failed entries count as zero.
    pub fn current_total_bytes(&self) -> u64 {
        self.entries.values().filter_map(|e| e.decoded_bytes).sum()
    }
}

// ---------------------------------------------------------------------------
// User event for waking the UI from decode jobs
// ---------------------------------------------------------------------------

pub enum UserEvent {
    DecodeFinished {
        ticket: DecodeTicket,
        result: Result<DecodedImage, String>,
    },
}

/// Runs each request on the rayon pool and posts the result back to the
/// event loop.
pub fn spawn_decodes(requests: Vec<DecodeRequest>, proxy: &EventLoopProxy<UserEvent>) {
    for req in requests {
        let proxy = proxy.clone();
        rayon::spawn(move || {
            let result = decode_image(&req.path);
            let event = UserEvent::DecodeFinished {
                ticket: req.ticket,
                result,
            };
            if proxy.send_event(event).is_err() {
                log::debug!("Event loop closed before decode of {} finished", req.ticket.index);
            }
        });
    }
}
