//! Shared statistical estimators for quality factors.
//!
//! Population (not sample) moments throughout, matching the estimators
//! the detectors are specified against.

// Statistical computation requires usize->f64 casts
#![allow(clippy::cast_precision_loss)]

/// Arithmetic mean. Returns `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median over a copy of the input. Returns `None` for an empty slice.
///
/// Even-length inputs use the average of the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Population variance. Returns `None` for an empty slice.
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Third-moment (Fisher) skewness: `E[(x - mean)^3] / std^3`.
///
/// Returns 0.0 when the standard deviation is zero (constant column).
pub fn skewness(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let s = std_dev(values)?;
    if s == 0.0 {
        return Some(0.0);
    }
    let n = values.len() as f64;
    let third = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    Some(third / s.powi(3))
}

/// First and third quartiles via sorted-index lookup.
///
/// Returns `None` when fewer than 4 values are present, matching the
/// minimum the IQR outlier rule needs to be meaningful.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 4 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    Some((sorted[n / 4], sorted[3 * n / 4]))
}

/// Pearson correlation coefficient over paired observations.
///
/// Returns `None` when the slices differ in length, hold fewer than two
/// pairs, or either side has zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Relative mean-median drift: `|mean - median| / |mean|`.
///
/// Returns `None` when the mean is zero (the ratio is undefined).
pub fn mean_median_drift(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m == 0.0 {
        return None;
    }
    let md = median(values)?;
    Some((m - md).abs() / m.abs())
}
