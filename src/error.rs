//! Errors from the host-facing parts of the program: configuration, photo
//! assets and screenshots. The interaction core itself never fails.

use std::fmt;

#[derive(Debug)]
pub(crate) enum SceneError {
    /// File or directory could not be read or written.
    Io(std::io::Error),
    /// Configuration file is not valid TOML for [`crate::config::Config`].
    Config(String),
    /// Photo decoding or screenshot encoding failed.
    Image(image::ImageError),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Config(msg) => write!(f, "config parse error: {msg}"),
            Self::Image(e) => write!(f, "image error: {e}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<image::ImageError> for SceneError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}
