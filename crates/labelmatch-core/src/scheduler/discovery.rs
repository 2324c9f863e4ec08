//! Enumerating the flat images directory into tasks.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::ConfigError;

/// One image waiting to be matched. Consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    /// Position in enumeration order (dispatch order)
    pub index: usize,
    /// Full path to the image
    pub path: PathBuf,
}

impl ImageTask {
    /// File name for status lines.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Finds the regular files directly inside the images directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// List the candidate files of `dir`, sorted by file name.
    ///
    /// Subdirectories are skipped, not descended into. Symlinks are
    /// followed, so a link to a regular file counts as one.
    pub fn discover(&self, dir: &Path) -> Result<Vec<ImageTask>, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::InputDirMissing(dir.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {:?}: {e}", dir);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.accepts(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        Ok(paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| ImageTask { index, path })
            .collect())
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.config.skip_hidden && is_hidden(path) {
            return false;
        }
        if self.config.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
