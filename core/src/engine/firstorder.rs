//! First-order intensity statistics over the region of interest

use std::collections::HashMap;

/// Guards `log2(0)` in the entropy sum
const ENTROPY_EPSILON: f64 = 2.2e-16;

/// Inputs shared by every first-order feature of one derived image
pub struct FirstOrderParams {
    pub bin_width: f64,
    /// Added to intensities before Energy, TotalEnergy and RootMeanSquared
    pub voxel_array_shift: f64,
    /// Volume of one voxel in cubic millimetres
    pub voxel_volume: f64,
}

/// Computes the first-order features, in a fixed order
///
/// `values` are the intensities inside the region of interest and must
/// not be empty.
pub fn first_order(values: &[f64], params: &FirstOrderParams) -> Vec<(&'static str, f64)> {
    let n = values.len() as f64;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let mean = values.iter().sum::<f64>() / n;
    let p10 = percentile(&sorted, 10.0);
    let p25 = percentile(&sorted, 25.0);
    let p75 = percentile(&sorted, 75.0);
    let p90 = percentile(&sorted, 90.0);

    let energy: f64 = values
        .iter()
        .map(|v| (v + params.voxel_array_shift).powi(2))
        .sum();

    let m2 = central_moment(values, mean, 2);
    let m3 = central_moment(values, mean, 3);
    let m4 = central_moment(values, mean, 4);

    let (entropy, uniformity) = histogram_stats(values, min, params.bin_width);

    vec![
        ("Energy", energy),
        ("TotalEnergy", energy * params.voxel_volume),
        ("Entropy", entropy),
        ("Minimum", min),
        ("10Percentile", p10),
        ("90Percentile", p90),
        ("Maximum", max),
        ("Mean", mean),
        ("Median", percentile(&sorted, 50.0)),
        ("InterquartileRange", p75 - p25),
        ("Range", max - min),
        ("MeanAbsoluteDeviation", mean_abs_deviation(values)),
        (
            "RobustMeanAbsoluteDeviation",
            robust_mean_abs_deviation(values, p10, p90),
        ),
        ("RootMeanSquared", (energy / n).sqrt()),
        ("Skewness", if m2 > 0.0 { m3 / m2.powf(1.5) } else { 0.0 }),
        ("Kurtosis", if m2 > 0.0 { m4 / (m2 * m2) } else { 0.0 }),
        ("Variance", m2),
        ("Uniformity", uniformity),
    ]
}

/// Linear-interpolated percentile of sorted data
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn central_moment(values: &[f64], mean: f64, order: i32) -> f64 {
    values.iter().map(|v| (v - mean).powi(order)).sum::<f64>() / values.len() as f64
}

fn mean_abs_deviation(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).abs()).sum::<f64>() / values.len() as f64
}

fn robust_mean_abs_deviation(values: &[f64], p10: f64, p90: f64) -> f64 {
    let inner: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| (p10..=p90).contains(v))
        .collect();
    if inner.is_empty() {
        0.0
    } else {
        mean_abs_deviation(&inner)
    }
}

/// Index of the fixed-width bin holding `value`
///
/// Bin edges are aligned to multiples of `bin_width`, starting at the edge
/// at or below the minimum.
pub fn bin_index(value: f64, min: f64, bin_width: f64) -> i64 {
    let low_bound = min - min.rem_euclid(bin_width);
    ((value - low_bound) / bin_width).floor() as i64 + 1
}

fn histogram_stats(values: &[f64], min: f64, bin_width: f64) -> (f64, f64) {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &v in values {
        *counts.entry(bin_index(v, min, bin_width)).or_insert(0) += 1;
    }

    let n = values.len() as f64;
    let mut entropy = 0.0;
    let mut uniformity = 0.0;
    for &count in counts.values() {
        let p = count as f64 / n;
        entropy -= p * (p + ENTROPY_EPSILON).log2();
        uniformity += p * p;
    }
    (entropy, uniformity)
}
