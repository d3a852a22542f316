/// Media store: register a new shared image, then write through its handle
///
/// Entries are described by display name, MIME type and a directory relative
/// to the store's root. Registration reserves the file; a clashing display
/// name gets a " (n)" suffix the way gallery apps do it.
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Give up finding a free name after this many suffixes
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Metadata for a new media entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub display_name: String,
    pub mime_type: String,
    pub relative_path: String,
}

/// Handle to a registered entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    path: PathBuf,
}

impl MediaHandle {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Structured media registration API
pub trait MediaStore: Send + Sync {
    /// Register a new entry. None when the store can't provide one.
    fn insert(&self, entry: &MediaEntry) -> Option<MediaHandle>;

    /// Open a writable stream against a registered entry
    fn open_output_stream(&self, handle: &MediaHandle) -> io::Result<Box<dyn Write + Send>>;

    /// Drop an entry whose write failed
    fn delete(&self, handle: &MediaHandle) -> io::Result<()>;

    /// Directory relative paths resolve against, if the store has one on disk
    fn root(&self) -> Option<&Path> {
        None
    }
}

/// Media store backed by a folder tree, rooted at the user's home by default
#[derive(Debug, Clone)]
pub struct FolderMediaStore {
    root: Option<PathBuf>,
}

impl FolderMediaStore {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Store rooted at the home directory (None if there isn't one)
    pub fn user_home() -> Self {
        Self::new(dirs::home_dir())
    }
}

/// Relative paths must stay under the root
fn is_contained(relative: &Path) -> bool {
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// `name.jpg` -> `name (n).jpg`
fn numbered_name(display_name: &str, n: u32) -> String {
    let path = Path::new(display_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| display_name.to_string());
    match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    }
}

impl MediaStore for FolderMediaStore {
    fn insert(&self, entry: &MediaEntry) -> Option<MediaHandle> {
        let root = self.root.as_ref()?;

        let relative = Path::new(&entry.relative_path);
        if !is_contained(relative) || !is_contained(Path::new(&entry.display_name)) {
            tracing::warn!(
                "rejecting media entry {:?} under {:?}",
                entry.display_name,
                entry.relative_path
            );
            return None;
        }

        let dir = root.join(relative);
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("cannot create {}: {}", dir.display(), e);
            return None;
        }

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                entry.display_name.clone()
            } else {
                numbered_name(&entry.display_name, attempt)
            };
            let path = dir.join(&name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    tracing::debug!("registered media entry {} ({})", path.display(), entry.mime_type);
                    return Some(MediaHandle::new(path));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    tracing::warn!("cannot register {}: {}", path.display(), e);
                    return None;
                }
            }
        }

        tracing::warn!("no free name for {} in {}", entry.display_name, dir.display());
        None
    }

    fn open_output_stream(&self, handle: &MediaHandle) -> io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(handle.path())?;
        Ok(Box::new(file))
    }

    fn delete(&self, handle: &MediaHandle) -> io::Result<()> {
        fs::remove_file(handle.path())
    }

    fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}
