use std::fmt;
use std::path::{Path, PathBuf};

/// One case: an image volume and the mask segmenting it
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct CasePair {
    pub image: PathBuf,
    pub mask: PathBuf,
}

impl CasePair {
    /// Creates a new CasePair
    pub fn new(image: impl Into<PathBuf>, mask: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            mask: mask.into(),
        }
    }

    /// Identifying name of the case: the image file name
    pub fn name(&self) -> String {
        file_name(&self.image)
    }

    /// File name of the mask
    pub fn mask_name(&self) -> String {
        file_name(&self.mask)
    }
}

impl fmt::Display for CasePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.name(), self.mask_name())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
