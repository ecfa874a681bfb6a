//! Small descriptive-statistics helpers shared by calibration, grid search
//! and patch measurement.
//!
//! Quantiles use linear interpolation between order statistics
//! (`pos = q · (n − 1)`), the convention of most numeric libraries.

/// Quantile `q ∈ [0, 1]` of an ascending-sorted slice. `None` when empty.
pub fn quantile_sorted(sorted: &[f32], q: f32) -> Option<f32> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) as f64 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let t = (pos - lo as f64) as f32;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * t)
}

/// Lower/upper quantiles of an unsorted sample.
pub fn quantile_range(values: &[f32], lower: f32, upper: f32) -> Option<(f32, f32)> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some((
        quantile_sorted(&sorted, lower)?,
        quantile_sorted(&sorted, upper)?,
    ))
}

/// Quantile of the sample described by a 256-bin intensity histogram.
pub fn quantile_from_histogram(hist: &[u64; 256], q: f32) -> Option<f32> {
    let n: u64 = hist.iter().sum();
    if n == 0 {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) as f64 * (n - 1) as f64;
    let lo = pos.floor() as u64;
    let hi = pos.ceil() as u64;
    let t = (pos - lo as f64) as f32;
    let a = nth_from_histogram(hist, lo) as f32;
    let b = nth_from_histogram(hist, hi) as f32;
    Some(a + (b - a) * t)
}

/// Value of the `k`-th (0-based) order statistic.
fn nth_from_histogram(hist: &[u64; 256], k: u64) -> u8 {
    let mut seen = 0u64;
    for (value, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > k {
            return value as u8;
        }
    }
    255
}

/// Clamp every value into `[lo, hi]` in place.
pub fn clip_in_place(values: &mut [f32], lo: f32, hi: f32) {
    for v in values.iter_mut() {
        *v = v.clamp(lo, hi);
    }
}

pub fn mean(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some(sum / values.len() as f64)
}

/// Population variance (divides by `n`).
pub fn variance(values: &[f32]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values
        .iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum();
    Some(ss / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quantiles_interpolate_linearly() {
        let sorted = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_abs_diff_eq!(quantile_sorted(&sorted, 0.5).unwrap(), 20.0);
        assert_abs_diff_eq!(quantile_sorted(&sorted, 0.1).unwrap(), 4.0);
        assert_abs_diff_eq!(quantile_sorted(&sorted, 1.0).unwrap(), 40.0);
        assert!(quantile_sorted(&[], 0.5).is_none());
    }

    #[test]
    fn histogram_quantiles_match_sorted_quantiles() {
        let samples: Vec<u8> = (0..500u32).map(|i| ((i * 37) % 256) as u8).collect();
        let mut hist = [0u64; 256];
        for &s in &samples {
            hist[s as usize] += 1;
        }
        let mut sorted: Vec<f32> = samples.iter().map(|&v| v as f32).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        for q in [0.0, 0.01, 0.37, 0.5, 0.99, 1.0] {
            assert_abs_diff_eq!(
                quantile_from_histogram(&hist, q).unwrap(),
                quantile_sorted(&sorted, q).unwrap(),
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn variance_is_population_variance() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(mean(&v).unwrap(), 2.5);
        assert_abs_diff_eq!(variance(&v).unwrap(), 1.25);
        assert!(variance(&[]).is_none());
    }
}
