//! Peak picking on a 1-D signal
//!
//! Local maxima (flat tops resolved to their midpoint), a minimum height,
//! and a minimum spacing enforced by keeping taller peaks first.

/// Indices of local maxima, plateaus reported at their midpoint
///
/// The first and last samples are never peaks.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
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
                let right = ahead - 1;
                peaks.push((i + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Drop peaks closer than `distance` samples to a taller kept peak
///
/// Returns a keep mask aligned with `peaks`. Among equal heights the later
/// peak wins.
fn select_by_distance(peaks: &[usize], heights: &[f64], distance: usize) -> Vec<bool> {
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| heights[a].total_cmp(&heights[b]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }

        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    keep
}

/// Find peaks at least `min_height` tall and `min_distance` samples apart
pub fn find_peaks(x: &[f64], min_height: f64, min_distance: usize) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(x)
        .into_iter()
        .filter(|&i| x[i] >= min_height)
        .collect();

    if min_distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let heights: Vec<f64> = candidates.iter().map(|&i| x[i]).collect();
    let keep = select_by_distance(&candidates, &heights, min_distance);

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(peak, kept)| kept.then_some(peak))
        .collect()
}
