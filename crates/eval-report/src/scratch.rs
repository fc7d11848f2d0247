//! Scratch area cleanup.
//!
//! Chart images live in the scratch directory only until the document that
//! embeds them is written. Cleanup never fails: every entry that cannot be
//! removed becomes a [`CleanupWarning`] and the rest are still processed.

use crate::error::CleanupWarning;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Delete every file and subdirectory inside `dir`, keeping `dir` itself.
///
/// A missing directory is already clean.
pub fn clear_dir(dir: &Path) -> Vec<CleanupWarning> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            let warning = CleanupWarning {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            };
            warn!("{}", warning);
            return vec![warning];
        }
    };

    let mut warnings = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warnings.push(CleanupWarning {
                    path: dir.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let is_dir = fs::symlink_metadata(&path)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        let result = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };

        if let Err(e) = result {
            warnings.push(CleanupWarning {
                path,
                reason: e.to_string(),
            });
        }
    }

    for warning in &warnings {
        warn!("{}", warning);
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_dir_removes_files_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pie_A_years.png"), b"png").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("x.png"), b"png").unwrap();

        let warnings = clear_dir(dir.path());

        assert!(warnings.is_empty());
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(clear_dir(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_clear_dir_on_file_reports_warning() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, b"x").unwrap();

        let warnings = clear_dir(&file);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path, file);
    }
}
