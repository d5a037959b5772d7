/// Percentile with linear interpolation between closest ranks.
///
/// `values` need not be sorted. `p` is clamped to `[0, 100]`. Returns
/// `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(percentile_of_sorted(&sorted, p))
}

pub fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// 256-bin histogram of an 8-bit sample.
pub fn histogram<'a>(values: impl IntoIterator<Item = &'a u8>) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for &v in values {
        hist[v as usize] += 1;
    }
    hist
}
