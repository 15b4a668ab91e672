//! Temporary files holding icon bytes.
//!
//! Both platforms load tray icons from files, so raw icon data is written to a
//! uniquely named file first. Staged files are removed on [`IconStaging::cleanup`].

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct IconStaging {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl IconStaging {
    /// Stages into `dir`, or the OS temp directory if `None`.
    pub fn new(dir: Option<&Path>) -> Self {
        Self {
            dir: dir.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
            files: Vec::new(),
        }
    }

    /// Writes `bytes` to a new file ending in `suffix` and returns its path.
    pub fn stage(&mut self, bytes: &[u8], suffix: &str) -> io::Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix("systray_")
            .suffix(suffix)
            .tempfile_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        debug!(path = %path.display(), size = bytes.len(), "staged icon file");
        self.files.push(path.clone());
        Ok(path)
    }

    #[cfg(test)]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Removes every staged file. Failures are logged.
    pub fn cleanup(&mut self) {
        for path in self.files.drain(..) {
            if let Err(error) = fs::remove_file(&path) {
                warn!(path = %path.display(), %error, "failed to remove staged icon file");
            }
        }
    }
}

/// File extension for encoded icon bytes, judged from the leading bytes.
pub fn icon_suffix(bytes: &[u8]) -> &'static str {
    const PNG: &[u8] = b"\x89PNG";
    const ICO: &[u8] = &[0, 0, 1, 0];
    if bytes.starts_with(PNG) {
        ".png"
    } else if bytes.starts_with(ICO) {
        ".ico"
    } else if bytes.trim_ascii_start().starts_with(b"<") {
        ".svg"
    } else {
        ".png"
    }
}
