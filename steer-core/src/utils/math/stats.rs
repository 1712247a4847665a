//! Sample statistics over a trial's error buffer.
//!
//! # Example
//! ```rust
//! use steer_core::utils::math::stats::{mean, sample_stddev};
//! let e = [1.0, -1.0, 1.0];
//! assert!((mean(&e) - 1.0 / 3.0).abs() < 1e-12);
//! assert!(sample_stddev(&e) > 1.0);
//! ```

/// Arithmetic mean. Returns `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with Bessel's correction (denominator `n - 1`).
///
/// Callers guarantee `values.len() >= 2`; shorter slices yield `0.0`.
pub fn sample_stddev(values: &[f64]) -> f64 {
    sample_stddev_about(values, mean(values))
}

/// Sample standard deviation about an already computed mean.
pub fn sample_stddev_about(
    values: &[f64],
    mean: f64,
) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values
        .iter()
        .map(|&x| {
            let d = x - mean;
            d * d
        })
        .sum();
    libm::sqrt(ss / (values.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_sample_stddev_known_values() {
        // [2, 4, 4, 4, 5, 5, 7, 9]: sum of squared deviations = 32, n - 1 = 7
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = libm::sqrt(32.0 / 7.0);
        assert!((sample_stddev(&v) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_sample_stddev_constant_is_zero() {
        assert_eq!(sample_stddev(&[0.5; 10]), 0.0);
    }

    #[test]
    fn test_sample_stddev_signed_alternating() {
        let v = [1.0, -1.0, 1.0];
        let expected = libm::sqrt(4.0 / 3.0);
        assert!((sample_stddev(&v) - expected).abs() < 1e-12);
    }
}
