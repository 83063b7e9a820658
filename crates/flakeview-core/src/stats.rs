//! Numeric helpers shared by the scorer, detectors, and aggregators.
//!
//! All functions degrade to 0 on samples too small to be meaningful rather
//! than erroring; callers treat 0 as "no measurable variability".

/// Arithmetic mean. 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N, not N-1). 0 below 2 values.
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Coefficient of variation: std-dev divided by mean. Scale-independent
/// variability measure used as the canonical "duration variability" metric.
/// 0 below 2 values or when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    if avg == 0.0 {
        return 0.0;
    }
    standard_deviation(values) / avg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn std_dev_below_two_samples_is_zero() {
        assert_eq!(standard_deviation(&[]), 0.0);
        assert_eq!(standard_deviation(&[42.0]), 0.0);
    }

    #[test]
    fn std_dev_is_population_not_sample() {
        // Population std-dev of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((standard_deviation(&values) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn std_dev_of_identical_values_is_zero() {
        assert_eq!(standard_deviation(&[1000.0, 1000.0, 1000.0]), 0.0);
    }

    #[test]
    fn cv_zero_mean_is_zero() {
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn cv_below_two_samples_is_zero() {
        assert_eq!(coefficient_of_variation(&[5.0]), 0.0);
    }

    #[test]
    fn cv_is_std_over_mean() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let expected = 2.0 / 5.0;
        assert!((coefficient_of_variation(&values) - expected).abs() < 1e-9);
    }
}
