//! Locally cached avatars and boss icons.
//!
//! Files are populated by a separate fetch stage. Rendering never waits for
//! it: a missing file is replaced by a transparent placeholder and, for
//! avatars, the user id is recorded so the fetcher can pick it up later.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;

use image::{Rgba, RgbaImage};
use log::{debug, warn};

use crate::error::RenderError;

pub const AVATAR_EXTENSION: &str = "jpg";
pub const ICON_EXTENSION: &str = "webp";

/// User ids whose avatar file was absent when a card was rendered.
///
/// Owned by the caller and shared by reference with every render call. The
/// fetch stage empties it with [`MissingAvatars::drain`], which takes the
/// whole set under one lock so ids recorded by concurrent renders are never
/// lost between reading and clearing.
#[derive(Debug, Default)]
pub struct MissingAvatars {
    ids: Mutex<BTreeSet<u64>>,
}

impl MissingAvatars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `user_id`, which must be numeric.
    pub fn record(&self, user_id: &str) -> Result<(), RenderError> {
        let id = user_id
            .trim()
            .parse::<u64>()
            .map_err(|source| RenderError::InvalidUserId {
                user_id: user_id.to_string(),
                source,
            })?;
        self.ids
            .lock()
            .expect("missing avatar set poisoned")
            .insert(id);
        Ok(())
    }

    pub fn drain(&self) -> BTreeSet<u64> {
        std::mem::take(&mut *self.ids.lock().expect("missing avatar set poisoned"))
    }

    pub fn len(&self) -> usize {
        self.ids.lock().expect("missing avatar set poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A directory of images keyed by file stem.
#[derive(Clone, Debug)]
pub struct ImageStore {
    dir: PathBuf,
    extension: &'static str,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, extension: &'static str) -> Self {
        Self {
            dir: dir.into(),
            extension,
        }
    }

    pub fn avatars(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, AVATAR_EXTENSION)
    }

    pub fn icons(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, ICON_EXTENSION)
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{}", self.extension))
    }

    /// Loads `key` if its file exists. A file that exists but cannot be read
    /// or decoded is an error.
    pub fn load(&self, key: &str) -> Result<Option<RgbaImage>, RenderError> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let image = image::open(&path).map_err(|source| match source {
            image::ImageError::IoError(source) => RenderError::Io {
                path: path.clone(),
                source,
            },
            source => RenderError::ImageLoad {
                path: path.clone(),
                source,
            },
        })?;
        debug!("loaded {}", path.display());
        Ok(Some(image.to_rgba8()))
    }

    /// Loads `key`, or returns a transparent `size` placeholder when the file
    /// is not cached yet.
    pub fn load_or_placeholder(
        &self,
        key: &str,
        size: (u32, u32),
    ) -> Result<(RgbaImage, bool), RenderError> {
        match self.load(key)? {
            Some(image) => Ok((image, true)),
            None => {
                warn!(
                    "{} not cached; using placeholder",
                    self.path_for(key).display()
                );
                Ok((placeholder(size), false))
            }
        }
    }
}

pub fn placeholder((width, height): (u32, u32)) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn drain_returns_everything_once() {
        let missing = MissingAvatars::new();
        missing.record("1002").unwrap();
        missing.record("1001").unwrap();
        missing.record("1002").unwrap();
        assert_eq!(missing.drain(), BTreeSet::from([1001, 1002]));
        assert!(missing.drain().is_empty());
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        let missing = MissingAvatars::new();
        let err = missing.record("alice").unwrap_err();
        assert!(matches!(err, RenderError::InvalidUserId { ref user_id, .. } if user_id == "alice"));
        assert!(missing.is_empty());
    }

    #[test]
    fn concurrent_records_are_all_drained() {
        use rayon::prelude::*;

        let missing = MissingAvatars::new();
        (0..500_u64)
            .into_par_iter()
            .for_each(|id| missing.record(&id.to_string()).unwrap());
        assert_eq!(missing.drain().len(), 500);
    }

    #[test]
    fn store_loads_existing_files_and_substitutes_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(4, 4, image::Rgb([1, 2, 3]))
            .save(dir.path().join("1001.jpg"))
            .unwrap();
        let store = ImageStore::avatars(dir.path());

        let (found, present) = store.load_or_placeholder("1001", (20, 20)).unwrap();
        assert!(present);
        assert_eq!(found.dimensions(), (4, 4));

        let (missing, present) = store.load_or_placeholder("1002", (20, 20)).unwrap();
        assert!(!present);
        assert_eq!(missing, placeholder((20, 20)));
    }

    #[test]
    fn undecodable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("7.webp"), b"not an image").unwrap();
        let store = ImageStore::icons(dir.path());
        assert!(store.load("7").is_err());
    }
}
