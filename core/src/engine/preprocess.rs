//! Image preparation ahead of filtering: cropping, normalization, resampling

use crate::error::EngineError;
use ndarray::{s, Array3};

/// Voxels of padding kept around the region of interest when cropping
pub const PAD_DISTANCE: usize = 5;

/// Relative tolerance below which resampling is skipped
const SPACING_TOLERANCE: f64 = 1e-6;

/// Largest resampled grid, in voxels, that a case may allocate
pub const MAX_RESAMPLED_VOXELS: usize = 1 << 27;

/// Inclusive bounding box of the region of interest, `None` if empty
pub fn bounding_box(roi: &Array3<bool>) -> Option<([usize; 3], [usize; 3])> {
    let mut lo = [usize::MAX; 3];
    let mut hi = [0usize; 3];
    let mut found = false;

    for ((x, y, z), &inside) in roi.indexed_iter() {
        if inside {
            found = true;
            for (axis, idx) in [x, y, z].into_iter().enumerate() {
                lo[axis] = lo[axis].min(idx);
                hi[axis] = hi[axis].max(idx);
            }
        }
    }
    found.then_some((lo, hi))
}

/// Crops image and ROI to the ROI bounding box plus `pad` voxels
pub fn crop_to_roi(
    image: &Array3<f64>,
    roi: &Array3<bool>,
    pad: usize,
) -> Option<(Array3<f64>, Array3<bool>)> {
    let (lo, hi) = bounding_box(roi)?;
    let shape = image.shape();
    let start: Vec<usize> = (0..3).map(|a| lo[a].saturating_sub(pad)).collect();
    let end: Vec<usize> = (0..3).map(|a| (hi[a] + pad + 1).min(shape[a])).collect();

    let window = s![start[0]..end[0], start[1]..end[1], start[2]..end[2]];
    Some((image.slice(window).to_owned(), roi.slice(window).to_owned()))
}

/// Rescales intensities to zero mean and unit deviation, times `scale`
///
/// Statistics are taken over the whole image. A flat image is only
/// centred.
pub fn normalize(image: &Array3<f64>, scale: f64) -> Array3<f64> {
    let n = image.len().max(1) as f64;
    let mean = image.sum() / n;
    let variance = image.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    if std > 0.0 {
        image.mapv(|v| (v - mean) / std * scale)
    } else {
        image.mapv(|v| v - mean)
    }
}

/// Returns true when `from` already matches `to` on every axis
pub fn spacing_matches(from: &[f64; 3], to: &[f64; 3]) -> bool {
    (0..3).all(|a| (from[a] - to[a]).abs() <= SPACING_TOLERANCE * from[a].abs().max(to[a].abs()))
}

/// Output grid size when resampling one axis
fn resampled_len(len: usize, from: f64, to: f64) -> usize {
    ((len as f64 * from / to).ceil() as usize).max(1)
}

/// Output grid shape, or an error if it exceeds [`MAX_RESAMPLED_VOXELS`]
fn resampled_shape(
    shape: &[usize],
    from: &[f64; 3],
    to: &[f64; 3],
) -> Result<(usize, usize, usize), EngineError> {
    let dims = [
        resampled_len(shape[0], from[0], to[0]),
        resampled_len(shape[1], from[1], to[1]),
        resampled_len(shape[2], from[2], to[2]),
    ];
    let voxels = dims[0]
        .checked_mul(dims[1])
        .and_then(|v| v.checked_mul(dims[2]));

    match voxels {
        Some(v) if v <= MAX_RESAMPLED_VOXELS => Ok((dims[0], dims[1], dims[2])),
        _ => Err(EngineError::InvalidConfig(format!(
            "resampling {:?} voxels from spacing {:?} to {:?} exceeds the limit of {} voxels",
            shape, from, to, MAX_RESAMPLED_VOXELS
        ))),
    }
}

/// Resamples image (trilinear) and ROI (nearest neighbour) onto a new spacing
///
/// Output voxel `i` sits at physical offset `i * to` from the first input
/// voxel. Samples past the last input voxel clamp to the edge.
///
/// # Errors
///
/// Returns [`EngineError::InvalidConfig`] if the output grid would hold
/// more than [`MAX_RESAMPLED_VOXELS`] voxels
pub fn resample(
    image: &Array3<f64>,
    roi: &Array3<bool>,
    from: &[f64; 3],
    to: &[f64; 3],
) -> Result<(Array3<f64>, Array3<bool>), EngineError> {
    if spacing_matches(from, to) {
        return Ok((image.clone(), roi.clone()));
    }

    let shape = image.shape();
    let out_shape = resampled_shape(shape, from, to)?;
    let ratio = [to[0] / from[0], to[1] / from[1], to[2] / from[2]];
    let max_idx = [shape[0] - 1, shape[1] - 1, shape[2] - 1];

    let resampled_image = Array3::from_shape_fn(out_shape, |(x, y, z)| {
        let pos = [x as f64 * ratio[0], y as f64 * ratio[1], z as f64 * ratio[2]];
        trilinear(image, pos, max_idx)
    });

    let resampled_roi = Array3::from_shape_fn(out_shape, |(x, y, z)| {
        let nearest = |i: usize, axis: usize| {
            ((i as f64 * ratio[axis]).round() as usize).min(max_idx[axis])
        };
        roi[[nearest(x, 0), nearest(y, 1), nearest(z, 2)]]
    });

    Ok((resampled_image, resampled_roi))
}

fn trilinear(image: &Array3<f64>, pos: [f64; 3], max_idx: [usize; 3]) -> f64 {
    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    let mut frac = [0f64; 3];
    for axis in 0..3 {
        let p = pos[axis].min(max_idx[axis] as f64);
        lo[axis] = p.floor() as usize;
        hi[axis] = (lo[axis] + 1).min(max_idx[axis]);
        frac[axis] = p - lo[axis] as f64;
    }

    let mut value = 0.0;
    for corner in 0..8 {
        let mut weight = 1.0;
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            if corner & (1 << axis) != 0 {
                idx[axis] = hi[axis];
                weight *= frac[axis];
            } else {
                idx[axis] = lo[axis];
                weight *= 1.0 - frac[axis];
            }
        }
        if weight > 0.0 {
            value += weight * image[idx];
        }
    }
    value
}
