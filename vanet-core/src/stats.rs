//! ## vanet-core::stats
//! **NaN-ignoring aggregates**
//!
//! All reductions skip non-finite inputs and return `f64::NAN` when nothing
//! finite is left. Percentiles interpolate linearly between closest ranks.

fn finite(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values.into_iter().filter(|v| v.is_finite()).collect()
}

pub fn nan_min(values: impl IntoIterator<Item = f64>) -> f64 {
    finite(values).into_iter().reduce(f64::min).unwrap_or(f64::NAN)
}

pub fn nan_max(values: impl IntoIterator<Item = f64>) -> f64 {
    finite(values).into_iter().reduce(f64::max).unwrap_or(f64::NAN)
}

pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let v = finite(values);
    if v.is_empty() {
        return f64::NAN;
    }
    v.iter().sum::<f64>() / v.len() as f64
}

/// `q` in `[0, 100]`.
pub fn nan_percentile(values: impl IntoIterator<Item = f64>, q: f64) -> f64 {
    let mut v = finite(values);
    if v.is_empty() || !(0.0..=100.0).contains(&q) {
        return f64::NAN;
    }
    v.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (v.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    v[lo] + (v[hi] - v[lo]) * (rank - lo as f64)
}

pub fn nan_median(values: impl IntoIterator<Item = f64>) -> f64 {
    nan_percentile(values, 50.0)
}

/// Mean, 95th percentile and max of one sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub mean: f64,
    pub p95: f64,
    pub max: f64,
}

impl Spread {
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: nan_mean(values.iter().copied()),
            p95: nan_percentile(values.iter().copied(), 95.0),
            max: nan_max(values.iter().copied()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_nan() {
        let v = [3.0, f64::NAN, 1.0, 2.0];
        assert_eq!(nan_min(v), 1.0);
        assert_eq!(nan_max(v), 3.0);
        assert_eq!(nan_mean(v), 2.0);
        assert_eq!(nan_median(v), 2.0);
    }

    #[test]
    fn empty_is_nan() {
        assert!(nan_min(Vec::<f64>::new()).is_nan());
        assert!(nan_mean([f64::NAN]).is_nan());
        assert!(nan_percentile(Vec::<f64>::new(), 90.0).is_nan());
    }

    #[test]
    fn linear_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((nan_percentile(v, 10.0) - 1.3).abs() < 1e-12);
        assert!((nan_percentile(v, 90.0) - 3.7).abs() < 1e-12);
        assert_eq!(nan_median(v), 2.5);
        assert!((nan_percentile([1.1, 4.1], 95.0) - 3.95).abs() < 1e-12);
    }
}
