//! Image/mask case pairing
//!
//! Two policies are available:
//! - [`PairingPolicy::Positional`] zips the sorted listings of both
//!   directories. Names are never compared, so the caller must name images
//!   and masks so that they sort identically.
//! - [`PairingPolicy::ByName`] keys each file by its case name and refuses
//!   to run if any file lacks a partner.

use crate::error::{RadiobatchError, Result};
use crate::types::CasePair;
use log::{debug, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Strategy for matching image files with mask files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum PairingPolicy {
    /// Zip sorted listings; `min(images, masks)` pairs, extras dropped
    #[default]
    Positional,
    /// Match on case key; any unmatched file is an error
    ByName,
}

/// Pairs image and mask files positionally
///
/// # Errors
///
/// Returns [`RadiobatchError::Path`] if either directory is missing or
/// unreadable
pub fn pair_cases(image_dir: &Path, mask_dir: &Path) -> Result<Vec<CasePair>> {
    pair_cases_with(image_dir, mask_dir, PairingPolicy::Positional)
}

/// Pairs image and mask files using the given policy
///
/// Both directories are listed before any pairing happens, so a bad mask
/// directory is reported even when the image directory is fine.
pub fn pair_cases_with(
    image_dir: &Path,
    mask_dir: &Path,
    policy: PairingPolicy,
) -> Result<Vec<CasePair>> {
    let images = list_entries(image_dir)?;
    let masks = list_entries(mask_dir)?;
    debug!(
        "Listed {} images and {} masks ({:?} pairing)",
        images.len(),
        masks.len(),
        policy
    );

    match policy {
        PairingPolicy::Positional => Ok(zip_positional(images, masks)),
        PairingPolicy::ByName => match_by_name(images, masks),
    }
}

/// Lists the regular, non-hidden files of a directory sorted by name
pub fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RadiobatchError::Path {
            path: dir.to_path_buf(),
            reason: "does not exist or is not a directory".to_string(),
        });
    }

    let path_err = |e: std::io::Error| RadiobatchError::Path {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(path_err)? {
        let path = entry.map_err(path_err)?.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);

        if path.is_file() && !hidden {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn zip_positional(images: Vec<PathBuf>, masks: Vec<PathBuf>) -> Vec<CasePair> {
    let count = images.len().min(masks.len());
    if images.len() != masks.len() {
        let (side, extra) = if images.len() > masks.len() {
            ("image", &images[count..])
        } else {
            ("mask", &masks[count..])
        };
        for path in extra {
            warn!("Dropping unpaired {} file: {}", side, path.display());
        }
    }

    images
        .into_iter()
        .zip(masks)
        .map(|(image, mask)| CasePair::new(image, mask))
        .collect()
}

fn match_by_name(images: Vec<PathBuf>, masks: Vec<PathBuf>) -> Result<Vec<CasePair>> {
    let mut mask_by_key: BTreeMap<String, PathBuf> = BTreeMap::new();
    for mask in masks {
        let key = case_key(&mask, true);
        if let Some(previous) = mask_by_key.insert(key.clone(), mask) {
            return Err(RadiobatchError::Pairing(format!(
                "multiple masks map to case '{}' (e.g. {})",
                key,
                previous.display()
            )));
        }
    }

    let mut pairs = Vec::with_capacity(images.len());
    let mut unmatched_images = Vec::new();
    for image in images {
        match mask_by_key.remove(&case_key(&image, false)) {
            Some(mask) => pairs.push(CasePair::new(image, mask)),
            None => unmatched_images.push(display_name(&image)),
        }
    }
    let unmatched_masks: Vec<String> = mask_by_key.values().map(|p| display_name(p)).collect();

    if !unmatched_images.is_empty() || !unmatched_masks.is_empty() {
        return Err(RadiobatchError::Pairing(format!(
            "unmatched images: [{}]; unmatched masks: [{}]",
            unmatched_images.join(", "),
            unmatched_masks.join(", ")
        )));
    }
    Ok(pairs)
}

/// Derives the case key used for name-based pairing
///
/// Strips known volume extensions and, for masks, a trailing
/// `_mask`/`-mask`/`_seg`/`_label`/`_roi` marker (case-insensitive).
///
/// # Example
///
/// ```
/// use radiobatch_core::pairing::case_key;
/// use std::path::Path;
///
/// assert_eq!(case_key(Path::new("A.nii.gz"), false), "A");
/// assert_eq!(case_key(Path::new("A_mask.nii.gz"), true), "A");
/// assert_eq!(case_key(Path::new("A_mask.nii.gz"), false), "A_mask");
/// ```
pub fn case_key(path: &Path, is_mask: bool) -> String {
    static EXTENSION: OnceLock<Regex> = OnceLock::new();
    static MASK_SUFFIX: OnceLock<Regex> = OnceLock::new();
    let ext = EXTENSION.get_or_init(|| {
        Regex::new(r"(?i)\.(nii\.gz|nii|nrrd|mha|mhd)$").expect("Failed to compile regex")
    });
    let suffix = MASK_SUFFIX.get_or_init(|| {
        Regex::new(r"(?i)[_-](mask|seg|label|roi)$").expect("Failed to compile regex")
    });

    let name = display_name(path);
    let stem = ext.replace(&name, "");
    if is_mask {
        suffix.replace(&stem, "").into_owned()
    } else {
        stem.into_owned()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
