use crate::coordinates::LtpPoint;
use crate::math::stats::StatsHelper;
use crate::prelude::{GrandError, GrandResult};
use serde::{Deserialize, Serialize};

/// Relative jitter tolerated between consecutive sample spacings.
const SAMPLING_TOLERANCE: f64 = 1e-6;

/// Simulated electric field at one antenna.
///
/// `times` are in ns, `field` samples in µV/m. Components are given along the
/// axes of the frame the trace was simulated in (the shower frame), and
/// `position` locates the antenna in that frame.
#[derive(Debug, Clone)]
pub struct ElectricField {
    pub times: Vec<f64>,
    pub field: Vec<[f64; 3]>,
    pub position: LtpPoint,
}

impl ElectricField {
    pub fn new(times: Vec<f64>, field: Vec<[f64; 3]>, position: LtpPoint) -> GrandResult<Self> {
        if times.len() != field.len() {
            return Err(GrandError::Domain(format!(
                "{} time samples for {} field samples",
                times.len(),
                field.len()
            )));
        }
        Ok(Self {
            times,
            field,
            position,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Uniform sample spacing in ns.
    pub fn sample_spacing(&self) -> GrandResult<f64> {
        if !StatsHelper::is_uniform(&self.times, SAMPLING_TOLERANCE) {
            return Err(GrandError::Domain(format!(
                "electric field at {:?} is not uniformly sampled ({} samples)",
                self.position.to_array(),
                self.len()
            )));
        }
        Ok(self.times[1] - self.times[0])
    }

    pub fn component(&self, axis: usize) -> Vec<f64> {
        self.field.iter().map(|sample| sample[axis]).collect()
    }
}

/// Voltage trace at the antenna terminals: `times` in ns, `values` in µV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voltage {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl Voltage {
    pub fn peak(&self) -> f64 {
        StatsHelper::peak(&self.values)
    }

    pub fn rms(&self) -> f64 {
        StatsHelper::rms(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::{GeodeticPosition, LocalFrame, Orientation};
    use std::sync::Arc;

    fn position() -> LtpPoint {
        let site = GeodeticPosition::ellipsoid(42.9, 86.7, 1200.0);
        let frame = Arc::new(LocalFrame::new(site, Orientation::NWU, None).unwrap());
        LtpPoint::new(0.0, 0.0, 0.0, frame)
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = ElectricField::new(vec![0.0, 1.0], vec![[0.0; 3]], position());
        assert!(matches!(result, Err(GrandError::Domain(_))));
    }

    #[test]
    fn components_and_spacing() {
        let field = ElectricField::new(
            vec![10.0, 10.5, 11.0],
            vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]],
            position(),
        )
        .unwrap();
        assert_eq!(field.component(1), vec![2.0, 5.0, 8.0]);
        assert_eq!(field.sample_spacing().unwrap(), 0.5);

        let single = ElectricField::new(vec![0.0], vec![[0.0; 3]], position()).unwrap();
        assert!(single.sample_spacing().is_err());
    }
}
