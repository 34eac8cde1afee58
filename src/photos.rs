//! Photo folder handling for broadcasts.
//!
//! Photos are ordered by the number embedded in their file name (`1.jpg`,
//! `2.jpg`, `10.jpg`), and every recipient gets its own window of that list.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").expect("valid regex"));

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Sort key: the digits of the file stem read as one number, 0 when none.
pub fn photo_number(path: &Path) -> u64 {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let digits = NON_DIGITS.replace_all(&stem, "");
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u64::MAX)
    }
}

/// Image files directly inside `dir`, in numeric order (file name breaks ties).
pub fn list_photos(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut photos = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            Error::StorageIo(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("photo folder walk failed")),
            )
        })?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            photos.push(entry.into_path());
        }
    }

    photos.sort_by(|a, b| {
        photo_number(a)
            .cmp(&photo_number(b))
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    Ok(photos)
}

/// The `[offset, offset + count)` window of the ordered photos, clamped to
/// what the folder holds.
pub fn select_batch(dir: &Path, count: usize, offset: usize) -> Result<Vec<PathBuf>> {
    let photos = list_photos(dir)?;
    if photos.is_empty() {
        warn!(dir = %dir.display(), "No photos found in folder");
        return Ok(Vec::new());
    }

    let end = offset.saturating_add(count).min(photos.len());
    if offset >= end {
        return Ok(Vec::new());
    }
    Ok(photos[offset..end].to_vec())
}
