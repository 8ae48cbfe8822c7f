use std::fmt;
use std::path::PathBuf;

/// How an error should be treated by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// The user asked for something that cannot be done right now.
    UserInput,
    /// A filesystem, decoder, clipboard or settings operation failed.
    Collaborator,
}

#[derive(Debug)]
pub enum AppError {
    /// Copy requested while no destination folder is configured.
    NoDestination,
    /// An action needs media but nothing is loaded.
    NoMedia,
    /// The opened folder contains no supported media.
    NoMediaFound(PathBuf),
    /// The file extension is not one we know how to show.
    Unsupported(PathBuf),
    /// Filesystem access failed.
    Io(String),
    /// Image decoding or probing failed.
    Decode(String),
    /// Clipboard access failed.
    Clipboard(String),
    /// Settings could not be read or written.
    Config(String),
}

impl AppError {
    pub fn category(&self) -> Category {
        match self {
            AppError::NoDestination
            | AppError::NoMedia
            | AppError::NoMediaFound(_)
            | AppError::Unsupported(_) => Category::UserInput,
            AppError::Io(_) | AppError::Decode(_) | AppError::Clipboard(_) | AppError::Config(_) => {
                Category::Collaborator
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoDestination => write!(f, "No destination folder selected"),
            AppError::NoMedia => write!(f, "No media selected"),
            AppError::NoMediaFound(dir) => write!(f, "No media files found in {}", dir.display()),
            AppError::Unsupported(path) => write!(f, "Unsupported file type: {}", path.display()),
            AppError::Io(msg) => write!(f, "File error: {}", msg),
            AppError::Decode(msg) => write!(f, "Decode error: {}", msg),
            AppError::Clipboard(msg) => write!(f, "Clipboard error: {}", msg),
            AppError::Config(msg) => write!(f, "Settings error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<arboard::Error> for AppError {
    fn from(err: arboard::Error) -> Self {
        AppError::Clipboard(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_input_errors_are_classified() {
        assert_eq!(AppError::NoDestination.category(), Category::UserInput);
        assert_eq!(AppError::NoMedia.category(), Category::UserInput);
        assert_eq!(
            AppError::Io("denied".into()).category(),
            Category::Collaborator
        );
    }

    #[test]
    fn messages_match_notifications() {
        assert_eq!(AppError::NoDestination.to_string(), "No destination folder selected");
        assert_eq!(AppError::NoMedia.to_string(), "No media selected");
    }
}
