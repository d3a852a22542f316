/// Photo storage module
///
/// This module handles:
/// - Choosing where a download is saved (media store entry or direct file path)
/// - Registering media store entries (media_store.rs)
/// - Resolving the public pictures directory (direct.rs)
/// - Encoding the decoded image as JPEG and writing it (photos.rs)

pub mod direct;
pub mod media_store;
pub mod photos;

pub use media_store::{FolderMediaStore, MediaEntry, MediaHandle, MediaStore};
pub use photos::{PhotoStorage, SavedImage, StorageLocation, StorageTarget};
