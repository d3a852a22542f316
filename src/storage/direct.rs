/// Direct file path backend
///
/// Resolves the public pictures directory and opens a plain file in it.
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Get the public pictures directory
///
/// Order: explicit override, the platform's pictures dir, then `~/Pictures`.
/// - Linux: $XDG_PICTURES_DIR (usually ~/Pictures)
/// - macOS: ~/Pictures
/// - Windows: {FOLDERID_Pictures}
pub fn public_pictures_dir(override_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = override_dir {
        return Some(dir.to_path_buf());
    }
    dirs::picture_dir().or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
}

/// Create `dir/filename` (creating `dir` if needed) for writing
pub fn create_file(dir: &Path, filename: &str) -> io::Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    let file = File::create(&path)?;
    Ok((file, path))
}
