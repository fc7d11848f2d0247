//! Output file naming and relocation.

use crate::error::{CleanupWarning, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Keep alphanumerics, space, hyphen and underscore; drop the rest and trim
/// trailing whitespace.
///
/// ```rust,ignore
/// assert_eq!(sanitize_filename("POPESCU, Ion (dr.)"), "POPESCU Ion dr");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// File name of a professor's report.
pub fn report_file_name(professor: &str) -> String {
    format!("report_{}.pdf", sanitize_filename(professor))
}

/// First free path for `file_name` in `dir`, appending `_1`, `_2`, ... before
/// the extension on collision.
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let extension = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// A report moved from staging to its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedFile {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Staged copy left behind after a copy fallback could not delete it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leftover: Option<CleanupWarning>,
}

/// Move `source` into `dest_dir` as `file_name` without overwriting anything
/// there; on collision the name gets `_1`, `_2`, ...
///
/// Pass the report's base name (see [`report_file_name`]), not the staged
/// name, so suffixes are counted against the destination only. Uses a rename
/// when possible and falls back to copy + delete across filesystems. Once the
/// copy succeeded the report is in place: a staged file that cannot be
/// deleted is returned in [`MovedFile::leftover`] instead of failing.
pub fn relocate(source: &Path, dest_dir: &Path, file_name: &str) -> Result<MovedFile> {
    fs::create_dir_all(dest_dir)
        .context(format!("Failed to create destination {}", dest_dir.display()))?;

    let target = unique_path(dest_dir, file_name);
    let mut leftover = None;

    if let Err(e) = fs::rename(source, &target) {
        debug!("Rename failed ({}), copying {} instead", e, source.display());
        fs::copy(source, &target).context(format!(
            "Failed to copy {} to {}",
            source.display(),
            target.display()
        ))?;
        leftover = remove_staged(source);
    }

    info!("Moved {} to {}", source.display(), target.display());
    Ok(MovedFile {
        from: source.to_path_buf(),
        to: target,
        leftover,
    })
}

/// Delete a staged file that has already been copied out.
fn remove_staged(source: &Path) -> Option<CleanupWarning> {
    let e = fs::remove_file(source).err()?;
    let warning = CleanupWarning {
        path: source.to_path_buf(),
        reason: e.to_string(),
    };
    warn!("Report copied but staged file kept: {}", warning);
    Some(warning)
}
