use crate::error::{RadiobatchError, Result};
use crate::types::filter::{FilterCategory, FilterSelection};
use crate::types::values::{parse_flag, parse_number, parse_number_list};

/// Number of LoG smoothing scales
pub const SIGMA_COUNT: usize = 5;

/// Number of resampling axes
pub const SPACING_AXES: usize = 3;

/// Unvalidated extraction parameters as a form or command line supplies them
///
/// Every field is text so that missing and non-numeric input can be
/// reported through [`RadiobatchError::Configuration`] instead of being
/// rejected earlier by a front end.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct RawParameters {
    pub bin_width: Option<String>,
    pub sigma: Vec<String>,
    pub resampled_spacing: Vec<String>,
    pub voxel_array_shift: Option<String>,
    pub normalize: Option<String>,
    pub normalize_scale: Option<String>,
    pub filters: Vec<String>,
}

impl Default for RawParameters {
    fn default() -> Self {
        Self {
            bin_width: Some("25.0".to_string()),
            sigma: ["1", "2", "3", "4", "5"].map(String::from).to_vec(),
            resampled_spacing: ["1.0", "1.0", "1.0"].map(String::from).to_vec(),
            voxel_array_shift: Some("1000".to_string()),
            normalize: Some("true".to_string()),
            normalize_scale: Some("100".to_string()),
            filters: vec!["Original".to_string()],
        }
    }
}

/// Validated, immutable extraction settings for one run
///
/// Built once per run and shared read-only by every case.
///
/// # Example
///
/// ```
/// use radiobatch_core::{ExtractionConfig, FilterCategory, RawParameters};
///
/// let raw = RawParameters {
///     bin_width: Some("25".to_string()),
///     filters: vec!["All".to_string()],
///     ..RawParameters::default()
/// };
///
/// let config = ExtractionConfig::from_raw(&raw).unwrap();
/// assert_eq!(config.bin_width(), 25.0);
/// assert_eq!(config.enabled_filters().len(), FilterCategory::ALL.len());
/// assert_eq!(ExtractionConfig::from_raw(&raw).unwrap(), config);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ExtractionConfig {
    bin_width: f64,
    sigma: [f64; SIGMA_COUNT],
    resampled_spacing: [f64; SPACING_AXES],
    voxel_array_shift: f64,
    normalize: bool,
    normalize_scale: f64,
    filters: FilterSelection,
}

impl ExtractionConfig {
    /// Starts a typed builder with the default parameters
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parses and validates raw form input
    ///
    /// # Errors
    ///
    /// Returns [`RadiobatchError::Configuration`] if a numeric field is
    /// missing or non-numeric, a list has the wrong length, a positivity
    /// constraint is violated, or the filter selection is empty or unknown.
    pub fn from_raw(raw: &RawParameters) -> Result<Self> {
        let bin_width = parse_number("binWidth", raw.bin_width.as_deref()).map_err(config_err)?;
        let sigma = parse_number_list("sigma", &raw.sigma, SIGMA_COUNT).map_err(config_err)?;
        let spacing = parse_number_list("resampledPixelSpacing", &raw.resampled_spacing, SPACING_AXES)
            .map_err(config_err)?;
        let voxel_array_shift = parse_number("voxelArrayShift", raw.voxel_array_shift.as_deref())
            .map_err(config_err)?;
        let normalize = parse_flag("normalize", raw.normalize.as_deref()).map_err(config_err)?;
        let normalize_scale = parse_number("normalizeScale", raw.normalize_scale.as_deref())
            .map_err(config_err)?;
        let filters = FilterSelection::parse(&raw.filters).map_err(config_err)?;

        ConfigBuilder {
            bin_width,
            sigma: [sigma[0], sigma[1], sigma[2], sigma[3], sigma[4]],
            resampled_spacing: [spacing[0], spacing[1], spacing[2]],
            voxel_array_shift,
            normalize,
            normalize_scale,
            filters,
        }
        .build()
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// LoG smoothing scales in millimetres
    pub fn sigma(&self) -> &[f64; SIGMA_COUNT] {
        &self.sigma
    }

    /// Target voxel spacing in millimetres (x, y, z)
    pub fn resampled_spacing(&self) -> &[f64; SPACING_AXES] {
        &self.resampled_spacing
    }

    pub fn voxel_array_shift(&self) -> f64 {
        self.voxel_array_shift
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn normalize_scale(&self) -> f64 {
        self.normalize_scale
    }

    pub fn filters(&self) -> &FilterSelection {
        &self.filters
    }

    /// Returns enabled categories, with `All` expanded
    pub fn enabled_filters(&self) -> Vec<FilterCategory> {
        self.filters.enabled()
    }

    pub fn is_enabled(&self, category: FilterCategory) -> bool {
        self.filters.contains(category)
    }
}

fn config_err(msg: String) -> RadiobatchError {
    RadiobatchError::Configuration(msg)
}

/// Typed builder for [`ExtractionConfig`]
///
/// Defaults match [`RawParameters::default`]. Validation happens in
/// [`ConfigBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBuilder {
    bin_width: f64,
    sigma: [f64; SIGMA_COUNT],
    resampled_spacing: [f64; SPACING_AXES],
    voxel_array_shift: f64,
    normalize: bool,
    normalize_scale: f64,
    filters: FilterSelection,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            bin_width: 25.0,
            sigma: [1.0, 2.0, 3.0, 4.0, 5.0],
            resampled_spacing: [1.0, 1.0, 1.0],
            voxel_array_shift: 1000.0,
            normalize: true,
            normalize_scale: 100.0,
            filters: FilterSelection::default(),
        }
    }
}

impl ConfigBuilder {
    pub fn bin_width(mut self, bin_width: f64) -> Self {
        self.bin_width = bin_width;
        self
    }

    pub fn sigma(mut self, sigma: [f64; SIGMA_COUNT]) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn resampled_spacing(mut self, spacing: [f64; SPACING_AXES]) -> Self {
        self.resampled_spacing = spacing;
        self
    }

    pub fn voxel_array_shift(mut self, shift: f64) -> Self {
        self.voxel_array_shift = shift;
        self
    }

    /// Enables or disables normalization with the given scale
    pub fn normalize(mut self, enabled: bool, scale: f64) -> Self {
        self.normalize = enabled;
        self.normalize_scale = scale;
        self
    }

    pub fn filters(mut self, filters: FilterSelection) -> Self {
        self.filters = filters;
        self
    }

    /// Validates and freezes the configuration
    ///
    /// # Errors
    ///
    /// Returns [`RadiobatchError::Configuration`] on any invariant violation
    pub fn build(self) -> Result<ExtractionConfig> {
        require_positive("binWidth", self.bin_width)?;
        for (i, s) in self.sigma.iter().enumerate() {
            require_positive(&format!("sigma {}", i + 1), *s)?;
        }
        for (i, s) in self.resampled_spacing.iter().enumerate() {
            require_positive(&format!("resampledPixelSpacing {}", i + 1), *s)?;
        }
        if !self.voxel_array_shift.is_finite() {
            return Err(config_err("voxelArrayShift must be finite".to_string()));
        }
        if self.normalize {
            require_positive("normalizeScale", self.normalize_scale)?;
        } else if !self.normalize_scale.is_finite() {
            return Err(config_err("normalizeScale must be finite".to_string()));
        }
        if self.filters.is_empty() {
            return Err(config_err(
                "at least one filter type must be selected".to_string(),
            ));
        }

        Ok(ExtractionConfig {
            bin_width: self.bin_width,
            sigma: self.sigma,
            resampled_spacing: self.resampled_spacing,
            voxel_array_shift: self.voxel_array_shift,
            normalize: self.normalize,
            normalize_scale: self.normalize_scale,
            filters: self.filters,
        })
    }
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(config_err(format!(
            "{} must be strictly positive, got {}",
            field, value
        )))
    }
}
