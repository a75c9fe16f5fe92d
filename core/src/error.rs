use std::path::PathBuf;
use thiserror::Error;

/// Result type for radiobatch operations
pub type Result<T> = std::result::Result<T, RadiobatchError>;

/// Error types for radiobatch operations
///
/// Only [`RadiobatchError::Extraction`] is recovered by the batch runner;
/// every other variant aborts the run.
#[derive(Error, Debug)]
pub enum RadiobatchError {
    /// Missing, non-numeric or out-of-range extraction parameter
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input directory missing or unreadable
    #[error("Path error: {}: {reason}", path.display())]
    Path { path: PathBuf, reason: String },

    /// Image and mask listings could not be matched by name
    #[error("Pairing error: {0}")]
    Pairing(String),

    /// A single case failed to extract
    #[error("{file}: {cause}")]
    Extraction { file: String, cause: String },

    /// Result table could not be written out
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RadiobatchError {
    /// Builds an extraction error for the named case
    pub fn extraction(file: impl Into<String>, cause: impl ToString) -> Self {
        RadiobatchError::Extraction {
            file: file.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for errors that only affect one case
    pub fn is_per_case(&self) -> bool {
        matches!(self, RadiobatchError::Extraction { .. })
    }
}

impl From<rust_xlsxwriter::XlsxError> for RadiobatchError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        RadiobatchError::Serialization(format!("{}", e))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for RadiobatchError {
    fn from(e: serde_json::Error) -> Self {
        RadiobatchError::Serialization(format!("{}", e))
    }
}

/// Failures raised inside a feature engine
///
/// These never leave the crate on their own: the engine adapter wraps
/// them into [`RadiobatchError::Extraction`] together with the case name.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Volume could not be read or decoded
    #[error("failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// Image and mask do not describe the same voxel grid
    #[error("geometry mismatch: {0}")]
    Geometry(String),

    /// Engine refused the configuration
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Mask has no voxel carrying the segmentation label
    #[error("no voxels with label {0} found in mask")]
    EmptyMask(u8),

    /// Numerical failure during feature computation
    #[error("computation failed: {0}")]
    Computation(String),
}
