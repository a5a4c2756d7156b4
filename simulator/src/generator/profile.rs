use crate::generator::template::{dipole_projection, gaussian_pulse};
use anyhow::Context;
use grandcore::antenna::{AntennaTable, ElectricField};
use grandcore::coordinates::{LocalFrame, LtpPoint, LtpVector};
use grandcore::shower::{ShowerEvent, ShowerGeometry};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Configuration for generating a synthetic shower.
///
/// `zenith` is measured from the vertical toward the incoming shower and
/// `azimuth` is that of the propagation direction, from north toward west.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Antennas per side of the square grid.
    pub grid: usize,
    /// Grid step in metres.
    pub step: f64,
    pub samples: usize,
    /// Sample spacing in ns.
    pub spacing: f64,
    /// Pulse width in ns.
    pub width: f64,
    /// Peak field in µV/m.
    pub amplitude: f64,
    pub noise: f64,
    pub seed: u64,
    pub zenith: f64,
    pub azimuth: f64,
    /// Distance from the core to the shower maximum, metres.
    pub xmax_distance: f64,
    /// Primary energy in GeV.
    pub energy: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            grid: 3,
            step: 50.0,
            samples: 1024,
            spacing: 0.5,
            width: 2.0,
            amplitude: 1000.0,
            noise: 5.0,
            seed: 0,
            zenith: 70.0,
            azimuth: 0.0,
            xmax_distance: 60_000.0,
            energy: 1.0e9,
        }
    }
}

impl GeneratorConfig {
    fn normalized_grid(&self) -> usize {
        self.grid.max(1)
    }

    fn normalized_samples(&self) -> usize {
        self.samples.max(2)
    }
}

/// Unit vector along which the shower propagates, in an NWU frame.
fn propagation_axis(config: &GeneratorConfig) -> [f64; 3] {
    let (sin_t, cos_t) = (180.0 - config.zenith).to_radians().sin_cos();
    let (sin_p, cos_p) = config.azimuth.to_radians().sin_cos();
    [sin_t * cos_p, sin_t * sin_p, cos_t]
}

/// Synthetic shower over a square antenna grid centred on the core.
///
/// Every antenna sees the same band-limited pulse, delayed with distance
/// along the shower axis and polarised along the geomagnetic Lorentz force
/// `v × B`. `frame` is expected to be the NWU shower frame.
pub fn build_shower(config: &GeneratorConfig, frame: Arc<LocalFrame>) -> anyhow::Result<ShowerEvent> {
    let grid = config.normalized_grid();
    let samples = config.normalized_samples();
    let antenna_count = grid
        .checked_mul(grid)
        .context("overflow computing antenna count for generator")?;

    let axis = propagation_axis(config);
    let geomagnet = [22_000.0, 0.0, -45_000.0];
    let polarisation = normalize(cross(axis, geomagnet))
        .context("shower axis parallel to the geomagnetic field")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let half = (grid as f64 - 1.0) / 2.0;
    let times: Vec<f64> = (0..samples).map(|i| i as f64 * config.spacing).collect();

    let mut fields = BTreeMap::new();
    for index in 0..antenna_count {
        let north = ((index / grid) as f64 - half) * config.step;
        let west = ((index % grid) as f64 - half) * config.step;
        let position = LtpPoint::new(north, west, 0.0, frame.clone());

        // Light travel delay along the axis relative to the core plane, in ns.
        let delay = (north * axis[0] + west * axis[1]) / 0.299_792_458;
        let center = (samples as f64 / 2.0 + delay / config.spacing).clamp(0.0, samples as f64 - 1.0);
        let envelope = gaussian_pulse(samples, center, config.width / config.spacing);

        let trace: Vec<[f64; 3]> = envelope
            .iter()
            .map(|&value| {
                let mut sample = [0.0; 3];
                for (component, direction) in sample.iter_mut().zip(polarisation) {
                    let jitter = if config.noise > 0.0 {
                        rng.gen_range(-config.noise..config.noise)
                    } else {
                        0.0
                    };
                    *component = config.amplitude * value * direction + jitter;
                }
                sample
            })
            .collect();

        let field = ElectricField::new(times.clone(), trace, position)
            .with_context(|| format!("building synthetic field for antenna {}", index))?;
        fields.insert(index, field);
    }

    let core = [0.0; 3];
    let maximum = [
        core[0] - config.xmax_distance * axis[0],
        core[1] - config.xmax_distance * axis[1],
        core[2] - config.xmax_distance * axis[2],
    ];

    Ok(ShowerEvent {
        geometry: ShowerGeometry {
            energy: config.energy,
            zenith: 180.0 - config.zenith,
            azimuth: config.azimuth,
            primary: 2212,
            core: LtpPoint::from_array(core, frame.clone()),
            geomagnet: LtpVector::from_array(geomagnet, frame.clone()),
            maximum: LtpPoint::from_array(maximum, frame.clone()),
        },
        fields,
        frame,
    })
}

/// Short dipole response for the EW arm over the upper hemisphere, flat
/// across 30 to 250 MHz.
pub fn build_antenna_table() -> AntennaTable {
    let frequency: Vec<f64> = (0..=11).map(|i| 30.0e6 + i as f64 * 20.0e6).collect();
    let theta: Vec<f64> = (0..=18).map(|i| i as f64 * 5.0).collect();
    let phi: Vec<f64> = (0..72).map(|i| i as f64 * 5.0).collect();

    let cube = |value: &dyn Fn(f64, f64) -> f64| -> Vec<Vec<Vec<f64>>> {
        frequency
            .iter()
            .map(|_| {
                theta
                    .iter()
                    .map(|&t| phi.iter().map(|&p| value(t, p)).collect())
                    .collect()
            })
            .collect()
    };
    let leff_theta = cube(&|t, p| dipole_projection(t, p).0);
    let leff_phi = cube(&|t, p| dipole_projection(t, p).1);
    let zero = cube(&|_, _| 0.0);

    AntennaTable {
        arm: "EW".into(),
        phase_theta: zero.clone(),
        phase_phi: zero,
        leff_theta,
        leff_phi,
        frequency,
        theta,
        phi,
    }
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if norm == 0.0 {
        return None;
    }
    Some([v[0] / norm, v[1] / norm, v[2] / norm])
}
