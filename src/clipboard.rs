use arboard::{Clipboard, ImageData};
use std::borrow::Cow;
use std::path::Path;

use crate::error::Result;

/// Decodes the file at `path` and puts its pixels on the clipboard.
pub fn copy_image(path: &Path) -> Result<()> {
    let rgba = image::open(path)?.into_rgba8();
    let (width, height) = rgba.dimensions();
    let data = ImageData {
        width: width as usize,
        height: height as usize,
        bytes: Cow::Owned(rgba.into_raw()),
    };
    Clipboard::new()?.set_image(data)?;
    log::info!("Copied image {} ({}x{}) to clipboard", path.display(), width, height);
    Ok(())
}

pub fn copy_path(path: &Path) -> Result<()> {
    Clipboard::new()?.set_text(path.to_string_lossy().into_owned())?;
    log::info!("Copied path {} to clipboard", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn unreadable_image_is_a_decode_error_before_touching_the_clipboard() {
        let err = copy_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }
}
