use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{AppError, Result};
use crate::media::is_media_file;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Lists the media files that live next to `path` (or inside it, when `path`
/// is a folder), sorted by path. Hidden files are skipped.
pub fn scan_folder(path: &Path) -> Result<Vec<PathBuf>> {
    let path = fs::canonicalize(path).map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))?;
    let dir = if path.is_dir() {
        path.as_path()
    } else {
        path.parent()
            .ok_or_else(|| AppError::Io(format!("{}: no parent folder", path.display())))?
    };

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && !is_hidden(p) && is_media_file(p))
        .collect();
    files.sort();

    log::info!("Scanned {:?}: {} media files", dir, files.len());
    Ok(files)
}

/// Resolves `path` to a media list and the index of the item to show first.
pub fn resolve_listing(path: &Path) -> Result<(Vec<PathBuf>, usize)> {
    let files = scan_folder(path)?;
    if files.is_empty() {
        return Err(AppError::NoMediaFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok((files, 0));
    }
    let canonical = fs::canonicalize(path)?;
    let index = files
        .iter()
        .position(|p| *p == canonical)
        .ok_or_else(|| AppError::Unsupported(path.to_path_buf()))?;
    Ok((files, index))
}

pub fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| AppError::Io(format!("{}: {}", path.display(), e)))
}

/// Copies `src` into `dest_folder`, appending ` (1)`, ` (2)`, … to the stem
/// until the name is free. Returns the path written.
pub fn copy_to_destination(src: &Path, dest_folder: &Path) -> Result<PathBuf> {
    if !src.is_file() {
        return Err(AppError::Io(format!("{}: source file does not exist", src.display())));
    }
    let file_name = src
        .file_name()
        .ok_or_else(|| AppError::Io(format!("{}: invalid file name", src.display())))?;

    let mut dest = dest_folder.join(file_name);
    let stem = src.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = src.extension().map(|e| e.to_string_lossy().into_owned());
    let mut count = 1;
    while dest.exists() {
        let name = match &ext {
            Some(ext) => format!("{} ({}).{}", stem, count, ext),
            None => format!("{} ({})", stem, count),
        };
        dest = dest_folder.join(name);
        count += 1;
    }

    fs::copy(src, &dest).map_err(|e| AppError::Io(format!("{}: {}", dest.display(), e)))?;
    log::info!("Copied {} -> {}", src.display(), dest.display());
    Ok(dest)
}

/// Turns a launch argument into a path. OS file associations may hand us a
/// `file://` URL instead of a plain path.
pub fn launch_path(arg: &str) -> PathBuf {
    Url::parse(arg)
        .ok()
        .filter(|u| u.scheme() == "file")
        .and_then(|u| u.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(arg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, b"x").expect("write");
        p
    }

    #[test]
    fn scan_lists_sorted_media_siblings_only() {
        let dir = tempdir().expect("tempdir");
        touch(dir.path(), "b.png");
        touch(dir.path(), "a.JPG");
        touch(dir.path(), "c.mp4");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".hidden.png");
        fs::create_dir(dir.path().join("sub.png")).expect("mkdir");

        let files = scan_folder(&dir.path().join("b.png")).expect("scan");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.mp4"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn scan_fails_for_missing_path() {
        let dir = tempdir().expect("tempdir");
        assert!(scan_folder(&dir.path().join("nope.png")).is_err());
    }

    #[test]
    fn resolve_listing_selects_opened_file() {
        let dir = tempdir().expect("tempdir");
        touch(dir.path(), "1.png");
        let second = touch(dir.path(), "2.png");
        touch(dir.path(), "3.png");

        let (files, index) = resolve_listing(&second).expect("resolve");
        assert_eq!(files.len(), 3);
        assert_eq!(index, 1);

        let (_, index) = resolve_listing(dir.path()).expect("resolve folder");
        assert_eq!(index, 0);
    }

    #[test]
    fn resolve_listing_rejects_empty_folders_and_unsupported_files() {
        let dir = tempdir().expect("tempdir");
        let txt = touch(dir.path(), "a.txt");
        assert!(matches!(resolve_listing(&txt), Err(AppError::NoMediaFound(_))));

        touch(dir.path(), "b.png");
        assert!(matches!(resolve_listing(&txt), Err(AppError::Unsupported(_))));
    }

    #[test]
    fn copy_appends_counter_on_collision() {
        let src_dir = tempdir().expect("tempdir");
        let dest_dir = tempdir().expect("tempdir");
        let src = touch(src_dir.path(), "cat.png");

        let first = copy_to_destination(&src, dest_dir.path()).expect("copy");
        let second = copy_to_destination(&src, dest_dir.path()).expect("copy");
        let third = copy_to_destination(&src, dest_dir.path()).expect("copy");

        assert_eq!(first, dest_dir.path().join("cat.png"));
        assert_eq!(second, dest_dir.path().join("cat (1).png"));
        assert_eq!(third, dest_dir.path().join("cat (2).png"));
    }

    #[test]
    fn copy_fails_for_missing_source_or_destination() {
        let dir = tempdir().expect("tempdir");
        assert!(copy_to_destination(&dir.path().join("missing.png"), dir.path()).is_err());

        let src = touch(dir.path(), "a.png");
        assert!(copy_to_destination(&src, &dir.path().join("no/such/dir")).is_err());
    }

    #[test]
    fn launch_path_keeps_plain_paths() {
        assert_eq!(launch_path("/tmp/a.png"), PathBuf::from("/tmp/a.png"));
        assert_eq!(launch_path("pics/b.png"), PathBuf::from("pics/b.png"));
        assert_eq!(
            launch_path("https://example.com/c.png"),
            PathBuf::from("https://example.com/c.png")
        );
    }

    #[cfg(unix)]
    #[test]
    fn launch_path_accepts_file_urls() {
        assert_eq!(
            launch_path("file:///tmp/my%20pic.png"),
            PathBuf::from("/tmp/my pic.png")
        );
        assert_eq!(
            launch_path("file://localhost/tmp/a.png"),
            PathBuf::from("/tmp/a.png")
        );
        assert_eq!(
            launch_path("file://remote-host/tmp/a.png"),
            PathBuf::from("file://remote-host/tmp/a.png")
        );
    }
}
