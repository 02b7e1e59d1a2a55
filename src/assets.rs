//! Photo assets for the billboards, decoded once at startup.
//!
//! The interaction core only ever sees [`TextureHandle`]s. A billboard whose
//! photo is missing simply carries no handle and renders with a plain
//! fallback texture.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::SceneError;

const PHOTO_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Longest edge a photo is uploaded with
const MAX_PHOTO_SIZE: u32 = 2048;

/// Opaque reference to a photo in the [`PhotoLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TextureHandle(usize);

impl TextureHandle {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Decoded RGBA8 photo
pub(crate) struct Photo {
    pub(crate) name: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba: Vec<u8>,
}

impl fmt::Debug for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Photo")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub(crate) struct PhotoLibrary {
    photos: Vec<Photo>,
}

impl PhotoLibrary {
    /// Decodes every png/jpeg file in `dir`, in file name order. Files that
    /// fail to decode are skipped.
    pub(crate) fn load_dir(dir: &Path) -> Result<Self, SceneError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        paths.sort();

        let mut photos = Vec::with_capacity(paths.len());
        for path in paths {
            match decode(&path) {
                Ok(photo) => photos.push(photo),
                Err(e) => log::warn!("skipping photo {}: {e}", path.display()),
            }
        }

        log::info!("loaded {} photos from {}", photos.len(), dir.display());
        Ok(Self { photos })
    }

    /// Like [`PhotoLibrary::load_dir`] but an unreadable directory just gives
    /// an empty library.
    pub(crate) fn load_or_empty(dir: &Path) -> Self {
        Self::load_dir(dir).unwrap_or_else(|e| {
            log::warn!("no photos from {}: {e}", dir.display());
            Self::default()
        })
    }

    #[cfg(test)]
    pub(crate) fn from_photos(photos: Vec<Photo>) -> Self {
        Self { photos }
    }

    pub(crate) fn len(&self) -> usize {
        self.photos.len()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, handle: TextureHandle) -> Option<&Photo> {
        self.photos.get(handle.0)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Photo> {
        self.photos.iter()
    }

    /// Handle for the billboard at `object_index`. Photos are reused
    /// cyclically when there are more billboards than photos.
    pub(crate) fn handle_for(&self, object_index: usize) -> Option<TextureHandle> {
        if self.photos.is_empty() {
            None
        } else {
            Some(TextureHandle(object_index % self.photos.len()))
        }
    }
}

fn decode(path: &Path) -> Result<Photo, SceneError> {
    let mut image = image::open(path)?;
    if image.width() > MAX_PHOTO_SIZE || image.height() > MAX_PHOTO_SIZE {
        log::debug!("downscaling {}", path.display());
        image = image.thumbnail(MAX_PHOTO_SIZE, MAX_PHOTO_SIZE);
    }
    let image = image.to_rgba8();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Photo {
        name,
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Writes an RGBA8 frame to `dir` as a timestamped PNG and returns its path.
pub(crate) fn save_screenshot(
    dir: &Path,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> Result<PathBuf, SceneError> {
    std::fs::create_dir_all(dir)?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let path = dir.join(format!("photocity-{stamp}.png"));
    image::save_buffer(&path, rgba, width, height, image::ColorType::Rgba8)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(name: &str) -> Photo {
        Photo {
            name: name.to_owned(),
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("photocity-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn handles_cycle_over_photos() {
        let library = PhotoLibrary::from_photos(vec![photo("a"), photo("b"), photo("c")]);
        let handles: Vec<usize> = (0..7)
            .filter_map(|i| library.handle_for(i))
            .map(TextureHandle::index)
            .collect();
        assert_eq!(handles, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn empty_library_gives_no_handles() {
        let library = PhotoLibrary::default();
        assert_eq!(library.handle_for(0), None);
        assert_eq!(library.handle_for(9), None);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let result = PhotoLibrary::load_dir(Path::new("/no/such/photo/dir"));
        assert!(matches!(result, Err(SceneError::Io(_))));
        assert_eq!(PhotoLibrary::load_or_empty(Path::new("/no/such/photo/dir")).len(), 0);
    }

    #[test]
    fn load_dir_decodes_and_skips_broken_files() {
        let dir = scratch_dir("load");
        image::save_buffer(dir.join("b.png"), &[0, 0, 255, 255], 1, 1, image::ColorType::Rgba8).unwrap();
        image::save_buffer(dir.join("a.png"), &[255; 16], 2, 2, image::ColorType::Rgba8).unwrap();
        std::fs::write(dir.join("c.jpg"), b"not a jpeg").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let library = PhotoLibrary::load_dir(&dir).unwrap();
        let names: Vec<&str> = library.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);

        let first = library.handle_for(0).and_then(|h| library.get(h)).unwrap();
        assert_eq!((first.width, first.height, first.rgba.len()), (2, 2, 16));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn screenshot_round_trips_through_png() {
        let dir = scratch_dir("shot");
        let pixels = [10, 20, 30, 255, 40, 50, 60, 255];
        let path = save_screenshot(&dir, &pixels, 2, 1).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.into_raw(), pixels.to_vec());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
