//! Derived images, one set per [`FilterCategory`]
//!
//! Derived image names follow the usual radiomics convention so that
//! exported columns line up with tables produced by other tools, e.g.
//! `wavelet-LLH`, `log-sigma-1-0-mm-3D`, `lbp-2D`.

use crate::error::EngineError;
use crate::types::FilterCategory;
use ndarray::{Array3, Axis};
use std::f64::consts::SQRT_2;

/// A filtered copy of the input image
#[derive(Debug, Clone)]
pub struct DerivedImage {
    pub name: String,
    pub data: Array3<f64>,
}

impl DerivedImage {
    fn new(name: impl Into<String>, data: Array3<f64>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Upper bound on a Gaussian kernel half-width, in voxels
const MAX_KERNEL_RADIUS: usize = 64;

/// Computes the derived images for one category
pub fn derive(
    category: FilterCategory,
    image: &Array3<f64>,
    spacing: &[f64; 3],
    sigmas: &[f64],
) -> Result<Vec<DerivedImage>, EngineError> {
    let images = match category {
        FilterCategory::Original => vec![DerivedImage::new("original", image.clone())],
        FilterCategory::Wavelet => wavelet(image),
        FilterCategory::Square => vec![DerivedImage::new("square", square(image))],
        FilterCategory::SquareRoot => vec![DerivedImage::new("squareroot", square_root(image))],
        FilterCategory::Logarithm => vec![DerivedImage::new("logarithm", logarithm(image))],
        FilterCategory::Exponential => {
            vec![DerivedImage::new("exponential", exponential(image))]
        }
        FilterCategory::Gradient => {
            vec![DerivedImage::new("gradient", gradient_magnitude(image, spacing))]
        }
        FilterCategory::LoG => {
            let mut out = Vec::with_capacity(sigmas.len());
            for &sigma in sigmas {
                if sigma <= 0.0 {
                    return Err(EngineError::InvalidConfig(format!(
                        "LoG sigma must be positive, got {}",
                        sigma
                    )));
                }
                out.push(DerivedImage::new(
                    format!("log-sigma-{}-mm-3D", sigma_label(sigma)),
                    laplacian_of_gaussian(image, spacing, sigma),
                ));
            }
            out
        }
        FilterCategory::Lbp2D => vec![DerivedImage::new("lbp-2D", lbp_2d(image))],
        FilterCategory::Lbp3D => vec![DerivedImage::new("lbp-3D", lbp_3d(image))],
    };
    Ok(images)
}

/// Formats a sigma the way it appears in derived image names (`1.0` -> `1-0`)
pub fn sigma_label(sigma: f64) -> String {
    let text = if sigma.fract() == 0.0 {
        format!("{:.1}", sigma)
    } else {
        format!("{}", sigma)
    };
    text.replace('.', "-")
}

fn max_abs(image: &Array3<f64>) -> f64 {
    image.iter().fold(0.0f64, |m, v| m.max(v.abs()))
}

fn square(image: &Array3<f64>) -> Array3<f64> {
    let m = max_abs(image);
    if m == 0.0 {
        return Array3::zeros(image.raw_dim());
    }
    let coeff = 1.0 / m.sqrt();
    image.mapv(|v| (coeff * v).powi(2))
}

fn square_root(image: &Array3<f64>) -> Array3<f64> {
    let coeff = max_abs(image);
    image.mapv(|v| v.signum() * (v.abs() * coeff).sqrt())
}

fn logarithm(image: &Array3<f64>) -> Array3<f64> {
    let m = max_abs(image);
    let logged = image.mapv(|v| v.signum() * (v.abs() + 1.0).ln());
    let lm = max_abs(&logged);
    if lm > 0.0 {
        logged.mapv(|v| v * m / lm)
    } else {
        logged
    }
}

fn exponential(image: &Array3<f64>) -> Array3<f64> {
    let m = max_abs(image);
    let coeff = if m > 0.0 { m.ln() / m } else { 0.0 };
    image.mapv(|v| (coeff * v).exp())
}

/// Difference along one axis, central inside and one-sided at the edges
fn derivative(image: &Array3<f64>, axis: usize, spacing: f64) -> Array3<f64> {
    let len = image.shape()[axis];
    if len < 2 {
        return Array3::zeros(image.raw_dim());
    }
    Array3::from_shape_fn(image.raw_dim(), |(x, y, z)| {
        let mut idx = [x, y, z];
        let i = idx[axis];
        let (a, b) = if i == 0 {
            (0, 1)
        } else if i == len - 1 {
            (len - 2, len - 1)
        } else {
            (i - 1, i + 1)
        };
        idx[axis] = a;
        let lo = image[idx];
        idx[axis] = b;
        let hi = image[idx];
        (hi - lo) / ((b - a) as f64 * spacing)
    })
}

fn gradient_magnitude(image: &Array3<f64>, spacing: &[f64; 3]) -> Array3<f64> {
    let dx = derivative(image, 0, spacing[0]);
    let dy = derivative(image, 1, spacing[1]);
    let dz = derivative(image, 2, spacing[2]);
    let mut out = dx.mapv(|v| v * v);
    out.zip_mut_with(&dy, |o, v| *o += v * v);
    out.zip_mut_with(&dz, |o, v| *o += v * v);
    out.mapv_inplace(f64::sqrt);
    out
}

fn gaussian_kernel(sigma_vox: f64) -> Vec<f64> {
    let radius = ((4.0 * sigma_vox).ceil() as usize).clamp(1, MAX_KERNEL_RADIUS);
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let d = i as f64 - radius as f64;
            (-d * d / (2.0 * sigma_vox * sigma_vox)).exp()
        })
        .collect();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= total);
    kernel
}

/// 1-D convolution along an axis with edge clamping
fn convolve_axis(image: &Array3<f64>, axis: usize, kernel: &[f64]) -> Array3<f64> {
    let len = image.shape()[axis];
    let radius = (kernel.len() / 2) as isize;
    Array3::from_shape_fn(image.raw_dim(), |(x, y, z)| {
        let mut idx = [x, y, z];
        let centre = idx[axis] as isize;
        let mut acc = 0.0;
        for (k, w) in kernel.iter().enumerate() {
            let pos = (centre + k as isize - radius).clamp(0, len as isize - 1);
            idx[axis] = pos as usize;
            acc += w * image[idx];
        }
        acc
    })
}

/// Axes with more than one voxel; a single slice is not filtered across
fn spatial_axes(image: &Array3<f64>) -> Vec<usize> {
    (0..3).filter(|&a| image.shape()[a] > 1).collect()
}

fn laplacian_of_gaussian(image: &Array3<f64>, spacing: &[f64; 3], sigma: f64) -> Array3<f64> {
    let mut smoothed = image.clone();
    for axis in spatial_axes(image) {
        let kernel = gaussian_kernel(sigma / spacing[axis]);
        smoothed = convolve_axis(&smoothed, axis, &kernel);
    }

    let mut out: Array3<f64> = Array3::zeros(image.raw_dim());
    for axis in spatial_axes(image) {
        let len = image.shape()[axis];
        let h2 = spacing[axis] * spacing[axis];
        let second = Array3::from_shape_fn(image.raw_dim(), |(x, y, z)| {
            let mut idx = [x, y, z];
            let i = idx[axis];
            let centre = smoothed[idx];
            idx[axis] = i.saturating_sub(1);
            let prev = smoothed[idx];
            idx[axis] = (i + 1).min(len - 1);
            let next = smoothed[idx];
            (prev - 2.0 * centre + next) / h2
        });
        out += &second;
    }
    out
}

/// Single-level undecimated Haar transform along one axis (periodic edges)
fn haar_axis(image: &Array3<f64>, axis: usize, high: bool) -> Array3<f64> {
    let len = image.shape()[axis];
    Array3::from_shape_fn(image.raw_dim(), |(x, y, z)| {
        let mut idx = [x, y, z];
        let a = image[idx];
        idx[axis] = (idx[axis] + 1) % len;
        let b = image[idx];
        if high {
            (a - b) / SQRT_2
        } else {
            (a + b) / SQRT_2
        }
    })
}

fn wavelet(image: &Array3<f64>) -> Vec<DerivedImage> {
    const BANDS: [&str; 8] = ["LLH", "LHL", "LHH", "HLL", "HLH", "HHL", "HHH", "LLL"];
    BANDS
        .iter()
        .map(|band| {
            let mut data = image.clone();
            for (axis, pass) in band.chars().enumerate() {
                data = haar_axis(&data, axis, pass == 'H');
            }
            DerivedImage::new(format!("wavelet-{}", band), data)
        })
        .collect()
}

/// Uniform rotation-invariant LBP, radius 1, 8 samples, per axial slice
fn lbp_2d(image: &Array3<f64>) -> Array3<f64> {
    const NEIGHBOURS: [(isize, isize); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];
    let (nx, ny) = (image.len_of(Axis(0)) as isize, image.len_of(Axis(1)) as isize);

    Array3::from_shape_fn(image.raw_dim(), |(x, y, z)| {
        let centre = image[[x, y, z]];
        let bits: Vec<bool> = NEIGHBOURS
            .iter()
            .map(|(dx, dy)| {
                let px = (x as isize + dx).clamp(0, nx - 1) as usize;
                let py = (y as isize + dy).clamp(0, ny - 1) as usize;
                image[[px, py, z]] >= centre
            })
            .collect();

        let transitions = (0..bits.len())
            .filter(|&i| bits[i] != bits[(i + 1) % bits.len()])
            .count();
        if transitions <= 2 {
            bits.iter().filter(|&&b| b).count() as f64
        } else {
            (bits.len() + 1) as f64
        }
    })
}

/// Count of 6-connected neighbours at or above the centre intensity
fn lbp_3d(image: &Array3<f64>) -> Array3<f64> {
    let shape = image.shape().to_vec();
    Array3::from_shape_fn(image.raw_dim(), |(x, y, z)| {
        let centre = image[[x, y, z]];
        let mut count = 0;
        for axis in 0..3 {
            for step in [-1isize, 1] {
                let mut idx = [x, y, z];
                let moved = idx[axis] as isize + step;
                if moved < 0 || moved >= shape[axis] as isize {
                    continue;
                }
                idx[axis] = moved as usize;
                if image[idx] >= centre {
                    count += 1;
                }
            }
        }
        f64::from(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Array3<f64> {
        Array3::from_shape_fn((6, 6, 4), |(x, y, z)| (x + 2 * y + 3 * z) as f64 - 10.0)
    }

    fn names(images: &[DerivedImage]) -> Vec<&str> {
        images.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_sigma_label() {
        assert_eq!(sigma_label(1.0), "1-0");
        assert_eq!(sigma_label(2.5), "2-5");
        assert_eq!(sigma_label(0.75), "0-75");
    }

    #[test]
    fn test_original_is_unchanged() {
        let image = ramp();
        let out = derive(FilterCategory::Original, &image, &[1.0; 3], &[]).unwrap();
        assert_eq!(names(&out), vec!["original"]);
        assert_eq!(out[0].data, image);
    }

    #[test]
    fn test_wavelet_band_names() {
        let out = derive(FilterCategory::Wavelet, &ramp(), &[1.0; 3], &[]).unwrap();
        assert_eq!(
            names(&out),
            vec![
                "wavelet-LLH",
                "wavelet-LHL",
                "wavelet-LHH",
                "wavelet-HLL",
                "wavelet-HLH",
                "wavelet-HHL",
                "wavelet-HHH",
                "wavelet-LLL"
            ]
        );
    }

    #[test]
    fn test_wavelet_high_pass_of_flat_image_is_zero() {
        let flat = Array3::from_elem((4, 4, 4), 3.0);
        let out = derive(FilterCategory::Wavelet, &flat, &[1.0; 3], &[]).unwrap();
        let hhh = out.iter().find(|d| d.name == "wavelet-HHH").unwrap();
        assert!(hhh.data.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_log_one_image_per_sigma() {
        let out = derive(FilterCategory::LoG, &ramp(), &[1.0; 3], &[1.0, 2.0]).unwrap();
        assert_eq!(names(&out), vec!["log-sigma-1-0-mm-3D", "log-sigma-2-0-mm-3D"]);
    }

    #[test]
    fn test_log_rejects_zero_sigma() {
        let result = derive(FilterCategory::LoG, &ramp(), &[1.0; 3], &[0.0]);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_log_of_flat_image_is_zero() {
        let flat = Array3::from_elem((5, 5, 5), 2.0);
        let out = derive(FilterCategory::LoG, &flat, &[1.0; 3], &[1.0]).unwrap();
        assert!(out[0].data.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_gradient_of_ramp() {
        let image = Array3::from_shape_fn((5, 3, 3), |(x, _, _)| 2.0 * x as f64);
        let out = derive(FilterCategory::Gradient, &image, &[0.5, 1.0, 1.0], &[]).unwrap();
        assert!(out[0].data.iter().all(|v| (v - 4.0).abs() < 1e-12));
    }

    #[test]
    fn test_square_and_square_root_keep_range() {
        let image = ramp();
        let m = max_abs(&image);
        let sq = derive(FilterCategory::Square, &image, &[1.0; 3], &[]).unwrap();
        assert!((max_abs(&sq[0].data) - m).abs() < 1e-9);
        let sqrt = derive(FilterCategory::SquareRoot, &image, &[1.0; 3], &[]).unwrap();
        assert!((max_abs(&sqrt[0].data) - m).abs() < 1e-9);
    }

    #[test]
    fn test_logarithm_keeps_range_and_sign() {
        let image = ramp();
        let out = derive(FilterCategory::Logarithm, &image, &[1.0; 3], &[]).unwrap();
        assert!((max_abs(&out[0].data) - max_abs(&image)).abs() < 1e-9);
        assert!(out[0].data[[0, 0, 0]] < 0.0);
    }

    #[test]
    fn test_exponential_is_bounded() {
        let image = ramp();
        let out = derive(FilterCategory::Exponential, &image, &[1.0; 3], &[]).unwrap();
        let m = max_abs(&image);
        assert!(out[0].data.iter().all(|&v| v > 0.0 && v <= m + 1e-9));
    }

    #[test]
    fn test_lbp_2d_range() {
        let out = derive(FilterCategory::Lbp2D, &ramp(), &[1.0; 3], &[]).unwrap();
        assert!(out[0].data.iter().all(|&v| (0.0..=9.0).contains(&v)));
    }

    #[test]
    fn test_lbp_3d_flat_counts_neighbours() {
        let flat = Array3::from_elem((3, 3, 3), 1.0);
        let out = derive(FilterCategory::Lbp3D, &flat, &[1.0; 3], &[]).unwrap();
        assert_eq!(out[0].data[[1, 1, 1]], 6.0);
        assert_eq!(out[0].data[[0, 0, 0]], 3.0);
    }
}
