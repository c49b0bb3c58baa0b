//! Paths the watcher ignores.

use std::path::{Component, Path};

use crate::error::WatchError;

/// Directory names that never trigger a reload.
const EXCLUDED_DIRS: &[&str] = &["node_modules"];

/// Files written by operating systems and file browsers.
const OS_METADATA_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Binary image extensions (compared case-insensitively).
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "svg",
];

/// Exclusion rules applied to paths relative to the serving root.
///
/// The built-in rules skip dotfiles and dot-directories (which covers `.git`),
/// `node_modules`, OS metadata files, and binary images. Extra glob patterns
/// are matched against the whole relative path.
#[derive(Debug, Default)]
pub struct ExcludeSet {
    patterns: Vec<glob::Pattern>,
}

impl ExcludeSet {
    /// Build the set from the built-in rules plus `extra` glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Pattern`] if a pattern is not a valid glob.
    pub fn new(extra: &[String]) -> Result<Self, WatchError> {
        let patterns = extra
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|source| WatchError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    /// Check whether a root-relative path is excluded.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        let hidden_or_excluded_dir = relative.components().any(|component| match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                name.starts_with('.') || EXCLUDED_DIRS.contains(&name.as_ref())
            }
            _ => false,
        });
        if hidden_or_excluded_dir {
            return true;
        }

        if let Some(name) = relative.file_name().map(|n| n.to_string_lossy())
            && OS_METADATA_FILES
                .iter()
                .any(|meta| meta.eq_ignore_ascii_case(&name))
        {
            return true;
        }

        if let Some(ext) = relative.extension().map(|e| e.to_string_lossy())
            && IMAGE_EXTENSIONS
                .iter()
                .any(|image| image.eq_ignore_ascii_case(&ext))
        {
            return true;
        }

        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative))
    }
}
