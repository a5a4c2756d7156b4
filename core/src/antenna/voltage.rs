use crate::antenna::field::{ElectricField, Voltage};
use crate::antenna::model::TabulatedAntennaModel;
use crate::coordinates::{rotate_components, Direction, LocalFrame};
use crate::math::fft::FftHelper;
use crate::prelude::{GrandError, GrandResult};
use num_complex::Complex64;
use rustfft::num_traits::Zero;
use std::sync::Arc;

/// Nanoseconds to seconds.
const NS: f64 = 1e-9;

/// A response model placed at a given location and orientation.
#[derive(Debug, Clone)]
pub struct Antenna {
    model: Arc<TabulatedAntennaModel>,
    frame: Arc<LocalFrame>,
}

impl Antenna {
    /// The tabulated zenith angle is measured from the frame's z axis, which
    /// must therefore point up.
    pub fn new(model: Arc<TabulatedAntennaModel>, frame: Arc<LocalFrame>) -> GrandResult<Self> {
        if frame.orientation().axes()[2] != Direction::Up {
            return Err(GrandError::Configuration(format!(
                "antenna frame {} must have its z axis pointing up",
                frame.orientation()
            )));
        }
        Ok(Self { model, frame })
    }

    pub fn model(&self) -> &Arc<TabulatedAntennaModel> {
        &self.model
    }

    pub fn frame(&self) -> &Arc<LocalFrame> {
        &self.frame
    }

    /// Voltage induced by `field` arriving from `direction`.
    ///
    /// `direction` points from the antenna toward the source. Both the
    /// direction and the field samples are expressed along the axes of
    /// `frame`. Spectral bins outside the tabulated band are treated as
    /// outside the antenna passband and contribute nothing.
    pub fn compute_voltage(
        &self,
        direction: [f64; 3],
        field: &ElectricField,
        frame: &LocalFrame,
    ) -> GrandResult<Voltage> {
        let spacing = field.sample_spacing()? * NS;

        let direction = rotate_components(direction, frame, &self.frame);
        let response = self.model.directional_response(direction)?;

        let local: Vec<[f64; 3]> = field
            .field
            .iter()
            .map(|&sample| rotate_components(sample, frame, &self.frame))
            .collect();

        let size = field.len();
        let mut fft = FftHelper::new(size);
        let spectra: Vec<Vec<Complex64>> = (0..3)
            .map(|axis| {
                let trace: Vec<f64> = local.iter().map(|sample| sample[axis]).collect();
                fft.forward(&trace)
            })
            .collect();

        let mut spectrum = vec![Complex64::zero(); size];
        for (index, bin) in spectrum.iter_mut().enumerate() {
            let frequency = fft.frequency(index, spacing);
            let leff = match response.at(frequency.abs()) {
                Some(leff) => leff,
                None => continue,
            };
            for axis in 0..3 {
                // Negative frequencies take the conjugate response so the
                // voltage stays real.
                let l = if frequency < 0.0 {
                    leff[axis].conj()
                } else {
                    leff[axis]
                };
                *bin += l * spectra[axis][index];
            }
        }

        Ok(Voltage {
            times: field.times.clone(),
            values: fft.inverse_real(&spectrum),
        })
    }
}
