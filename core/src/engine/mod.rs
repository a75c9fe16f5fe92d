//! Feature computation engines
//!
//! The batch pipeline only sees the [`FeatureEngine`] and [`EngineFactory`]
//! traits. [`NativeEngine`] is the built-in implementation: first-order
//! statistics over every enabled derived image plus voxel volume.

pub mod filters;
pub mod firstorder;
mod native;
pub mod preprocess;
pub mod volume;

pub use native::{NativeEngine, NativeEngineFactory};
pub use volume::Volume;

use crate::error::EngineError;
use crate::types::ExtractionConfig;

/// Computes features for one image/mask pair
pub trait FeatureEngine {
    /// Runs feature computation
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] for geometry problems, an empty region of
    /// interest, or any numerical failure.
    fn execute(&mut self, image: &Volume, mask: &Volume) -> Result<FeatureVector, EngineError>;
}

/// Builds independently configured engines
///
/// Called once per case, so no engine state is ever shared between cases.
pub trait EngineFactory: Sync {
    type Engine: FeatureEngine;

    /// Configures a fresh engine
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the engine rejects the
    /// configuration
    fn build(&self, config: &ExtractionConfig) -> Result<Self::Engine, EngineError>;
}

/// Feature name to value, in computation order
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a feature, replacing any previous value with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_keeps_insertion_order() {
        let vector: FeatureVector = [("b", 2.0), ("a", 1.0), ("c", 3.0)].into_iter().collect();
        assert_eq!(vector.names().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_feature_vector_insert_replaces() {
        let mut vector = FeatureVector::new();
        vector.insert("x", 1.0);
        vector.insert("x", 2.0);
        assert_eq!(vector.len(), 1);
        assert_eq!(vector.get("x"), Some(2.0));
        assert_eq!(vector.get("y"), None);
    }
}
