use crate::error::EngineError;
use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;

/// Relative tolerance when comparing image and mask spacing
pub const GEOMETRY_TOLERANCE: f64 = 1e-3;

/// Segmentation label marking the region of interest
pub const ROI_LABEL: u8 = 1;

/// A 3-D scalar volume with physical voxel spacing
///
/// Indexed `[x, y, z]`. 2-D inputs are stored as a single slice along z.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub data: Array3<f64>,
    /// Voxel spacing in millimetres (x, y, z)
    pub spacing: [f64; 3],
}

impl Volume {
    /// Creates a new Volume
    pub fn new(data: Array3<f64>, spacing: [f64; 3]) -> Self {
        Self { data, spacing }
    }

    /// Reads a NIfTI-1 volume (`.nii` or `.nii.gz`)
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Load`] if the file is missing, the header is
    /// corrupt, or the data has fewer than 2 or more than 3 non-trivial
    /// dimensions
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let load_err = |reason: String| EngineError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let obj = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| load_err(format!("{}", e)))?;

        let pixdim = obj.header().pixdim;
        let spacing = [
            positive_or_unit(pixdim[1]),
            positive_or_unit(pixdim[2]),
            positive_or_unit(pixdim[3]),
        ];

        let data = obj
            .into_volume()
            .into_ndarray::<f64>()
            .map_err(|e| load_err(format!("{}", e)))?;
        let data = into_3d(data).map_err(load_err)?;

        let spacing = if data.shape()[2] == 1 {
            [spacing[0], spacing[1], 1.0]
        } else {
            spacing
        };
        Ok(Self { data, spacing })
    }

    pub fn shape(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    /// Volume of one voxel in cubic millimetres
    pub fn voxel_volume(&self) -> f64 {
        self.spacing.iter().product()
    }

    /// Boolean region of interest for the given label
    pub fn roi(&self, label: u8) -> Array3<bool> {
        let label = f64::from(label);
        self.data.mapv(|v| v.round() == label)
    }
}

fn positive_or_unit(value: f32) -> f64 {
    let value = f64::from(value);
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

fn into_3d(mut data: ArrayD<f64>) -> Result<Array3<f64>, String> {
    while data.ndim() > 3 {
        let last = data.ndim() - 1;
        if data.shape()[last] != 1 {
            return Err(format!(
                "expected a 3-D volume, got shape {:?}",
                data.shape()
            ));
        }
        data = data.index_axis_move(Axis(last), 0);
    }
    if data.ndim() == 2 {
        data = data.insert_axis(Axis(2));
    }
    let shape = data.shape().to_vec();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| format!("expected a 2-D or 3-D volume, got shape {:?}", shape))
}

/// Checks that image and mask share one voxel grid
///
/// # Errors
///
/// Returns [`EngineError::Geometry`] on a shape mismatch or a spacing
/// difference above [`GEOMETRY_TOLERANCE`] on any axis
pub fn check_geometry(image: &Volume, mask: &Volume) -> Result<(), EngineError> {
    if image.shape() != mask.shape() {
        return Err(EngineError::Geometry(format!(
            "image size {:?} does not match mask size {:?}",
            image.shape(),
            mask.shape()
        )));
    }

    for axis in 0..3 {
        let (a, b) = (image.spacing[axis], mask.spacing[axis]);
        if (a - b).abs() > GEOMETRY_TOLERANCE * a.abs().max(b.abs()) {
            return Err(EngineError::Geometry(format!(
                "image spacing {:?} does not match mask spacing {:?}",
                image.spacing, mask.spacing
            )));
        }
    }
    Ok(())
}
