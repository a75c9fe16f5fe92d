//! Per-case feature extraction
//!
//! [`EngineAdapter`] turns an [`EngineFactory`] into a [`CaseExtractor`]:
//! every call builds a freshly configured engine, loads both volumes and
//! runs the engine. Whatever goes wrong comes back as
//! [`RadiobatchError::Extraction`] naming the case.

use crate::engine::{EngineFactory, FeatureEngine, FeatureVector, Volume};
use crate::error::{EngineError, RadiobatchError, Result};
use crate::types::{CasePair, ExtractionConfig};
use log::debug;
use std::panic::{self, AssertUnwindSafe};

/// Extracts the feature vector of one case
///
/// Implementations must be callable from several worker threads at once.
pub trait CaseExtractor: Sync {
    /// # Errors
    ///
    /// Returns [`RadiobatchError::Extraction`] carrying the case name and
    /// the underlying cause
    fn extract(&self, config: &ExtractionConfig, pair: &CasePair) -> Result<FeatureVector>;
}

/// Adapter running a fresh engine from `F` for every case
#[derive(Debug, Clone, Default)]
pub struct EngineAdapter<F> {
    factory: F,
}

impl<F: EngineFactory> EngineAdapter<F> {
    /// Creates a new adapter
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    fn run_engine(
        &self,
        config: &ExtractionConfig,
        pair: &CasePair,
    ) -> std::result::Result<FeatureVector, EngineError> {
        let mut engine = self.factory.build(config)?;
        let image = Volume::load(&pair.image)?;
        let mask = Volume::load(&pair.mask)?;
        debug!(
            "Loaded {} {:?} and {} {:?}",
            pair.name(),
            image.shape(),
            pair.mask_name(),
            mask.shape()
        );
        engine.execute(&image, &mask)
    }
}

impl<F: EngineFactory> CaseExtractor for EngineAdapter<F> {
    fn extract(&self, config: &ExtractionConfig, pair: &CasePair) -> Result<FeatureVector> {
        let name = pair.name();
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_engine(config, pair))) {
            Ok(Ok(features)) => Ok(features),
            Ok(Err(e)) => Err(RadiobatchError::extraction(name, e)),
            Err(payload) => Err(RadiobatchError::extraction(
                name,
                format!("engine panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
