use crate::engine::filters::derive;
use crate::engine::firstorder::{first_order, FirstOrderParams};
use crate::engine::preprocess::{crop_to_roi, normalize, resample, PAD_DISTANCE};
use crate::engine::volume::{check_geometry, Volume, ROI_LABEL};
use crate::engine::{EngineFactory, FeatureEngine, FeatureVector};
use crate::error::EngineError;
use crate::types::{ExtractionConfig, FilterCategory};
use log::debug;

/// Built-in feature engine
///
/// Pipeline per case: geometry check, optional normalization, crop to the
/// region of interest, resampling to the configured spacing, then one
/// block of first-order features per derived image. The original image
/// additionally yields `original_shape_VoxelVolume`.
#[derive(Debug, Clone)]
pub struct NativeEngine {
    config: ExtractionConfig,
    categories: Vec<FilterCategory>,
}

impl NativeEngine {
    /// Configures an engine for one case
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if no category is enabled or
    /// the bin width is not positive
    pub fn new(config: &ExtractionConfig) -> Result<Self, EngineError> {
        let categories = config.enabled_filters();
        if categories.is_empty() {
            return Err(EngineError::InvalidConfig(
                "no image types enabled".to_string(),
            ));
        }
        if !(config.bin_width() > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "bin width must be positive, got {}",
                config.bin_width()
            )));
        }

        Ok(Self {
            config: config.clone(),
            categories,
        })
    }

    /// Categories this engine computes, in output order
    pub fn enabled(&self) -> &[FilterCategory] {
        &self.categories
    }
}

impl FeatureEngine for NativeEngine {
    fn execute(&mut self, image: &Volume, mask: &Volume) -> Result<FeatureVector, EngineError> {
        check_geometry(image, mask)?;

        let roi = mask.roi(ROI_LABEL);
        let data = if self.config.normalize() {
            normalize(&image.data, self.config.normalize_scale())
        } else {
            image.data.clone()
        };

        let (data, roi) =
            crop_to_roi(&data, &roi, PAD_DISTANCE).ok_or(EngineError::EmptyMask(ROI_LABEL))?;

        let spacing = *self.config.resampled_spacing();
        let (data, roi) = resample(&data, &roi, &image.spacing, &spacing)?;
        if !roi.iter().any(|&inside| inside) {
            return Err(EngineError::EmptyMask(ROI_LABEL));
        }
        debug!(
            "Prepared {:?} voxels at spacing {:?} for {} image types",
            data.shape(),
            spacing,
            self.categories.len()
        );

        let voxel_volume: f64 = spacing.iter().product();
        let params = FirstOrderParams {
            bin_width: self.config.bin_width(),
            voxel_array_shift: self.config.voxel_array_shift(),
            voxel_volume,
        };

        let mut features = FeatureVector::new();
        for &category in &self.categories {
            for derived in derive(category, &data, &spacing, self.config.sigma())? {
                let values: Vec<f64> = derived
                    .data
                    .iter()
                    .zip(roi.iter())
                    .filter(|(_, &inside)| inside)
                    .map(|(&v, _)| v)
                    .collect();

                if category == FilterCategory::Original {
                    features.insert(
                        "original_shape_VoxelVolume",
                        values.len() as f64 * voxel_volume,
                    );
                }

                for (name, value) in first_order(&values, &params) {
                    let column = format!("{}_firstorder_{}", derived.name, name);
                    if !value.is_finite() {
                        return Err(EngineError::Computation(format!(
                            "{} is not finite",
                            column
                        )));
                    }
                    features.insert(column, value);
                }
            }
        }

        Ok(features)
    }
}

/// Factory producing a fresh [`NativeEngine`] per case
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngineFactory;

impl EngineFactory for NativeEngineFactory {
    type Engine = NativeEngine;

    fn build(&self, config: &ExtractionConfig) -> Result<NativeEngine, EngineError> {
        NativeEngine::new(config)
    }
}
