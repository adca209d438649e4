//! Output file naming and placement.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::MediaResult;

/// Longest file stem derived from a title.
const MAX_TITLE_STEM: usize = 80;

/// Keep letters, digits, spaces and underscores; spaces become underscores.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    kept.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_TITLE_STEM)
        .collect()
}

/// File name for the clip at 1-based `index`.
///
/// A title with at least one usable character names the file; otherwise the
/// numbered `Corte_NNN_<unix>` form is used.
pub fn clip_file_name(index: usize, title: Option<&str>, unix_secs: i64) -> String {
    match title.map(sanitize_title).filter(|s| !s.is_empty()) {
        Some(stem) => format!("{}.mp4", stem),
        None => format!("Corte_{:03}_{}.mp4", index, unix_secs),
    }
}

/// First free path for `file_name` in `dir`, adding `_2`, `_3`... as needed.
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (file_name, String::new()),
    };
    (2..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Move a finished render into place, copying across filesystems.
pub async fn move_file(src: &Path, dst: &Path) -> MediaResult<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(src = %src.display(), dst = %dst.display(), "Cross-device move, copying");
            let staging = dst.with_extension("part");
            fs::copy(src, &staging).await?;
            if let Err(e) = fs::rename(&staging, dst).await {
                let _ = fs::remove_file(&staging).await;
                return Err(e.into());
            }
            let _ = fs::remove_file(src).await;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV
    e.raw_os_error() == Some(18)
}
