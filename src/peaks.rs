//! One-dimensional peak detection on sampled signals (histograms, intensity
//! profiles).
//!
//! Peaks are strict local maxima; flat tops report their midpoint. Each peak
//! carries its topographic prominence and its width measured at half the
//! prominence, with linear interpolation between samples. Filters apply in
//! the order distance → prominence → width.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub height: f32,
    pub prominence: f32,
    pub width: f32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PeakOptions {
    /// Minimum width (samples) at half prominence.
    pub min_width: Option<f32>,
    /// Minimum index distance between retained peaks; taller peaks win.
    pub min_distance: Option<usize>,
    pub min_prominence: Option<f32>,
}

/// Find peaks of `signal`, returned in ascending index order.
pub fn find_peaks(signal: &[f32], opts: &PeakOptions) -> Vec<Peak> {
    let mut candidates = local_maxima(signal);
    if let Some(distance) = opts.min_distance.filter(|&d| d > 1) {
        candidates = select_by_distance(signal, &candidates, distance);
    }

    let mut peaks = Vec::with_capacity(candidates.len());
    for idx in candidates {
        let (prominence, left_base, right_base) = prominence(signal, idx);
        if opts.min_prominence.is_some_and(|p| prominence < p) {
            continue;
        }
        let width = width_at_half_prominence(signal, idx, prominence, left_base, right_base);
        if opts.min_width.is_some_and(|w| width < w) {
            continue;
        }
        peaks.push(Peak {
            index: idx,
            height: signal[idx],
            prominence,
            width,
        });
    }
    peaks
}

/// Gaussian smoothing with clamped borders. `sigma <= 0` returns a copy.
pub fn gaussian_smooth(signal: &[f32], sigma: f32) -> Vec<f32> {
    if sigma.is_nan() || sigma <= 0.0 || signal.is_empty() {
        return signal.to_vec();
    }
    let radius = (3.0 * sigma).ceil() as isize;
    let taps: Vec<f32> = (-radius..=radius)
        .map(|k| (-(k * k) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let norm: f32 = taps.iter().sum();
    let last = signal.len() as isize - 1;
    (0..signal.len() as isize)
        .map(|i| {
            let acc: f32 = taps
                .iter()
                .zip(-radius..=radius)
                .map(|(&t, k)| t * signal[(i + k).clamp(0, last) as usize])
                .sum();
            acc / norm
        })
        .collect()
}

fn local_maxima(x: &[f32]) -> Vec<usize> {
    let mut out = Vec::new();
    if x.len() < 3 {
        return out;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                out.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    out
}

fn select_by_distance(x: &[f32], peaks: &[usize], distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]).then(a.cmp(&b)));
    let mut keep = vec![true; peaks.len()];
    for &j in &order {
        if !keep[j] {
            continue;
        }
        for (k, kept) in keep.iter_mut().enumerate() {
            if k != j && peaks[k].abs_diff(peaks[j]) < distance {
                *kept = false;
            }
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Prominence plus the left/right base indices.
fn prominence(x: &[f32], peak: usize) -> (f32, usize, usize) {
    let top = x[peak];

    let mut left_min = top;
    let mut left_base = peak;
    let mut i = peak as isize;
    while i >= 0 && x[i as usize] <= top {
        if x[i as usize] < left_min {
            left_min = x[i as usize];
            left_base = i as usize;
        }
        i -= 1;
    }

    let mut right_min = top;
    let mut right_base = peak;
    let mut j = peak;
    while j < x.len() && x[j] <= top {
        if x[j] < right_min {
            right_min = x[j];
            right_base = j;
        }
        j += 1;
    }

    (top - left_min.max(right_min), left_base, right_base)
}

fn width_at_half_prominence(
    x: &[f32],
    peak: usize,
    prominence: f32,
    left_base: usize,
    right_base: usize,
) -> f32 {
    let height = x[peak] - 0.5 * prominence;

    let mut i = peak;
    while left_base < i && height < x[i] {
        i -= 1;
    }
    let mut left_ip = i as f32;
    if x[i] < height {
        left_ip += (height - x[i]) / (x[i + 1] - x[i]);
    }

    let mut i = peak;
    while i < right_base && height < x[i] {
        i += 1;
    }
    let mut right_ip = i as f32;
    if x[i] < height {
        right_ip -= (height - x[i]) / (x[i - 1] - x[i]);
    }

    right_ip - left_ip
}
