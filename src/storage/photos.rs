/// Save decoded images to photo storage
///
/// The backend is picked once from the platform's capabilities: a media
/// store entry when one can be registered, otherwise a file written straight
/// into the public pictures directory. Either way the image is written as a
/// quality-100 JPEG named `<epoch-millis>.jpg`.
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use super::direct;
use super::media_store::{FolderMediaStore, MediaEntry, MediaStore};
use crate::config::{Settings, StorageMode};
use crate::error::StorageError;
use crate::state::data::DecodedImage;

/// JPEG quality factor, fixed at maximum
pub const JPEG_QUALITY: u8 = 100;

/// MIME type registered with media store entries
pub const MIME_TYPE: &str = "image/jpg";

/// Where a save goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLocation {
    MediaStoreEntry,
    DirectFilePath,
}

impl StorageLocation {
    /// Pick a backend. `Auto` prefers the media store when it has a root.
    pub fn select(mode: StorageMode, media_store_available: bool) -> Self {
        match mode {
            StorageMode::MediaStore => StorageLocation::MediaStoreEntry,
            StorageMode::DirectFile => StorageLocation::DirectFilePath,
            StorageMode::Auto if media_store_available => StorageLocation::MediaStoreEntry,
            StorageMode::Auto => StorageLocation::DirectFilePath,
        }
    }
}

/// Filename and backend for a single save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub filename: String,
    pub location: StorageLocation,
}

impl StorageTarget {
    pub fn new(epoch_millis: i64, location: StorageLocation) -> Self {
        Self {
            filename: filename_for(epoch_millis),
            location,
        }
    }
}

/// `<epoch-millis>.jpg`
pub fn filename_for(epoch_millis: i64) -> String {
    format!("{}.jpg", epoch_millis)
}

/// A completed save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub target: StorageTarget,
}

/// Writes images through the selected backend
pub struct PhotoStorage {
    location: StorageLocation,
    media_store: Box<dyn MediaStore>,
    relative_path: String,
    pictures_dir: Option<PathBuf>,
}

impl PhotoStorage {
    pub fn new(
        location: StorageLocation,
        media_store: Box<dyn MediaStore>,
        relative_path: impl Into<String>,
        pictures_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            location,
            media_store,
            relative_path: relative_path.into(),
            pictures_dir,
        }
    }

    /// Build storage for this machine from settings
    pub fn from_settings(settings: &Settings) -> Self {
        let media_store = FolderMediaStore::user_home();
        let location = StorageLocation::select(settings.storage_mode, media_store.root().is_some());
        let pictures_dir = direct::public_pictures_dir(settings.pictures_dir.as_deref());

        tracing::info!(
            "saving to {:?} (media root {:?}, pictures dir {:?})",
            location,
            media_store.root(),
            pictures_dir
        );

        Self::new(
            location,
            Box::new(media_store),
            settings.relative_path.clone(),
            pictures_dir,
        )
    }

    /// Directory new images land in, for display in prompts
    pub fn destination(&self) -> Option<PathBuf> {
        match self.location {
            StorageLocation::MediaStoreEntry => self
                .media_store
                .root()
                .map(|root| root.join(&self.relative_path)),
            StorageLocation::DirectFilePath => self.pictures_dir.clone(),
        }
    }

    /// Save `image` as `<now-millis>.jpg`.
    ///
    /// Returns `Ok(None)` when the media store could not hand out an entry;
    /// nothing is written in that case.
    pub fn persist(&self, image: DecodedImage) -> Result<Option<SavedImage>, StorageError> {
        self.persist_at(image, Utc::now().timestamp_millis())
    }

    /// Same as [`persist`](Self::persist) with an explicit timestamp
    pub fn persist_at(
        &self,
        image: DecodedImage,
        epoch_millis: i64,
    ) -> Result<Option<SavedImage>, StorageError> {
        let target = StorageTarget::new(epoch_millis, self.location);

        let path = match target.location {
            StorageLocation::MediaStoreEntry => {
                let entry = MediaEntry {
                    display_name: target.filename.clone(),
                    mime_type: MIME_TYPE.to_string(),
                    relative_path: self.relative_path.clone(),
                };
                let Some(handle) = self.media_store.insert(&entry) else {
                    tracing::debug!("media store gave no handle for {}", target.filename);
                    return Ok(None);
                };

                let written = self
                    .media_store
                    .open_output_stream(&handle)
                    .map_err(|source| io_error(handle.path(), source))
                    .and_then(|stream| write_jpeg(stream, &image, handle.path()));

                if let Err(e) = written {
                    if let Err(cleanup) = self.media_store.delete(&handle) {
                        tracing::warn!("could not remove {}: {}", handle.path().display(), cleanup);
                    }
                    return Err(e);
                }
                handle.path().to_path_buf()
            }
            StorageLocation::DirectFilePath => {
                let dir = self.pictures_dir.as_ref().ok_or(StorageError::NoPicturesDir)?;
                let (file, path) = direct::create_file(dir, &target.filename)
                    .map_err(|source| io_error(&dir.join(&target.filename), source))?;
                if let Err(e) = write_jpeg(file, &image, &path) {
                    if let Err(cleanup) = std::fs::remove_file(&path) {
                        tracing::warn!("could not remove {}: {}", path.display(), cleanup);
                    }
                    return Err(e);
                }
                path
            }
        };

        tracing::info!("💾 saved {}", path.display());
        Ok(Some(SavedImage { path, target }))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Encode as JPEG into `stream`. The stream is dropped (closed) on return,
/// whether or not the write succeeded.
fn write_jpeg<W: Write>(stream: W, image: &DecodedImage, path: &Path) -> Result<(), StorageError> {
    let mut writer = BufWriter::new(stream);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.as_dynamic().to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))?;

    writer.flush().map_err(|source| io_error(path, source))
}
