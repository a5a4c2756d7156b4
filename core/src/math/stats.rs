pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    pub fn peak(samples: &[f64]) -> f64 {
        samples.iter().fold(0.0, |acc, &v| acc.max(v.abs()))
    }

    /// True when consecutive differences all match the first one.
    pub fn is_uniform(samples: &[f64], relative_tolerance: f64) -> bool {
        if samples.len() < 2 {
            return false;
        }
        let step = samples[1] - samples[0];
        if step <= 0.0 || !step.is_finite() {
            return false;
        }
        samples
            .windows(2)
            .all(|pair| ((pair[1] - pair[0]) - step).abs() <= relative_tolerance * step)
    }
}
