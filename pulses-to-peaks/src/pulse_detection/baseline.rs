use crate::{Real, datatype::PulseProperties};

/// Computes baseline, one-sided noise and extremes of a polarity corrected pulse.
///
/// The baseline is the mean of the first `initial_baseline_samples` samples
/// (or all of them, for a shorter pulse). The noise is the RMS deviation of
/// the samples lying below the baseline, and zero if there are none.
pub fn compute_pulse_properties(w: &[Real], initial_baseline_samples: usize) -> PulseProperties {
    let n_initial = initial_baseline_samples.min(w.len());
    if n_initial == 0 {
        return PulseProperties {
            baseline: 0.0,
            noise_sigma: 0.0,
            minimum: 0.0,
            maximum: 0.0,
        };
    }
    let baseline = w.iter().take(n_initial).sum::<Real>() / n_initial as Real;

    let mut sum_squares = 0.0;
    let mut n_below = 0usize;
    let mut minimum = Real::INFINITY;
    let mut maximum = Real::NEG_INFINITY;
    for &x in w {
        if x < baseline {
            sum_squares += (x - baseline).powi(2);
            n_below += 1;
        }
        minimum = minimum.min(x);
        maximum = maximum.max(x);
    }
    let noise_sigma = if n_below == 0 {
        0.0
    } else {
        (sum_squares / n_below as Real).sqrt()
    };

    PulseProperties {
        baseline,
        noise_sigma,
        minimum: minimum - baseline,
        maximum: maximum - baseline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use rand_distr::{Distribution, Normal};

    #[test]
    fn flat_pulse() {
        let properties = compute_pulse_properties(&[7.0; 30], 10);
        assert_approx_eq!(properties.baseline, 7.0);
        assert_eq!(properties.noise_sigma, 0.0);
        assert_approx_eq!(properties.minimum, 0.0);
        assert_approx_eq!(properties.maximum, 0.0);
    }

    #[test]
    fn baseline_window_clamped_to_pulse() {
        let properties = compute_pulse_properties(&[1.0, 3.0], 50);
        assert_approx_eq!(properties.baseline, 2.0);
        assert_approx_eq!(properties.noise_sigma, 1.0);
        assert_approx_eq!(properties.minimum, -1.0);
        assert_approx_eq!(properties.maximum, 1.0);
    }

    #[test]
    fn noise_ignores_samples_above_baseline() {
        // Baseline 10 from the first four samples
        let w = [9.0, 11.0, 8.0, 12.0, 10.0, 200.0, 150.0, 10.0];
        let properties = compute_pulse_properties(&w, 4);
        assert_approx_eq!(properties.baseline, 10.0);
        // Below baseline: 9 and 8
        assert_approx_eq!(properties.noise_sigma, (2.5 as Real).sqrt());
        assert_approx_eq!(properties.minimum, -2.0);
        assert_approx_eq!(properties.maximum, 190.0);
    }

    #[test]
    fn empty_pulse() {
        let properties = compute_pulse_properties(&[], 10);
        assert_eq!(properties.baseline, 0.0);
        assert_eq!(properties.noise_sigma, 0.0);
    }

    #[test]
    fn gaussian_noise() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let normal = Normal::new(100.0, 4.0).expect("valid distribution");
        let w: Vec<Real> = (0..20_000).map(|_| normal.sample(&mut rng)).collect();
        let properties = compute_pulse_properties(&w, 20_000);
        assert_approx_eq!(properties.baseline, 100.0, 0.2);
        assert_approx_eq!(properties.noise_sigma, 4.0, 0.2);
        assert!(properties.minimum < 0.0);
        assert!(properties.maximum > 0.0);
    }
}
