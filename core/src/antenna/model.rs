use crate::prelude::{GrandError, GrandResult};
use crate::telemetry::LogManager;
use ndarray::Array3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const FULL_TURN: f64 = 360.0;
const GRID_TOLERANCE: f64 = 1e-9;

/// Raw effective length table as stored on disk.
///
/// The four data arrays are indexed `[frequency][theta][phi]`. Amplitudes are
/// in metres, phases in degrees, frequencies in Hz and angles in degrees.
/// Theta is the zenith angle from the antenna's local z axis and phi the
/// azimuth from its local x axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntennaTable {
    #[serde(default = "default_arm")]
    pub arm: String,
    pub frequency: Vec<f64>,
    pub theta: Vec<f64>,
    pub phi: Vec<f64>,
    pub leff_theta: Vec<Vec<Vec<f64>>>,
    pub phase_theta: Vec<Vec<Vec<f64>>>,
    pub leff_phi: Vec<Vec<Vec<f64>>>,
    pub phase_phi: Vec<Vec<Vec<f64>>>,
}

fn default_arm() -> String {
    "EW".to_string()
}

/// Tabulated effective length of a single antenna arm.
///
/// Amplitude and phase are combined into complex values on load. Directions
/// are interpolated bilinearly over (theta, phi) on the real and imaginary
/// parts, so phases crossing ±180° stay continuous; phi wraps around when the
/// grid covers a full turn. Frequencies are interpolated linearly on the
/// complex Cartesian components.
#[derive(Debug, Clone)]
pub struct TabulatedAntennaModel {
    arm: String,
    frequency: Vec<f64>,
    theta: Vec<f64>,
    phi: Vec<f64>,
    phi_periodic: bool,
    leff_theta: Array3<Complex64>,
    leff_phi: Array3<Complex64>,
}

/// Effective length for one fixed direction, at every tabulated frequency.
#[derive(Debug, Clone)]
pub struct DirectionalResponse<'a> {
    frequency: &'a [f64],
    values: Vec<[Complex64; 3]>,
}

impl TabulatedAntennaModel {
    pub fn load<P: AsRef<Path>>(path: P) -> GrandResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            GrandError::MissingData(format!("antenna table {}: {}", path.display(), err))
        })?;
        let table: AntennaTable = serde_json::from_str(&contents).map_err(|err| {
            GrandError::Configuration(format!("antenna table {}: {}", path.display(), err))
        })?;
        Self::from_table(table)
    }

    pub fn from_table(table: AntennaTable) -> GrandResult<Self> {
        check_grid("frequency", &table.frequency)?;
        check_grid("theta", &table.theta)?;
        check_grid("phi", &table.phi)?;

        let shape = (table.frequency.len(), table.theta.len(), table.phi.len());
        let leff_theta = to_complex(
            to_array("leff_theta", &table.leff_theta, shape)?,
            to_array("phase_theta", &table.phase_theta, shape)?,
        );
        let leff_phi = to_complex(
            to_array("leff_phi", &table.leff_phi, shape)?,
            to_array("phase_phi", &table.phase_phi, shape)?,
        );

        let phi_periodic = is_full_turn(&table.phi);

        LogManager::new("antenna").caution(&format!(
            "tabulated model describes the {} arm only; voltages omit the orthogonal arm",
            table.arm
        ));

        Ok(Self {
            arm: table.arm,
            frequency: table.frequency,
            theta: table.theta,
            phi: table.phi,
            phi_periodic,
            leff_theta,
            leff_phi,
        })
    }

    pub fn arm(&self) -> &str {
        &self.arm
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequency
    }

    /// Frequency band covered by the table, in Hz.
    pub fn band(&self) -> (f64, f64) {
        (self.frequency[0], self.frequency[self.frequency.len() - 1])
    }

    /// Complex effective length (m) for a direction given in the antenna
    /// frame, along the frame's x, y and z axes.
    pub fn effective_length(&self, direction: [f64; 3], frequency: f64) -> GrandResult<[Complex64; 3]> {
        let response = self.directional_response(direction)?;
        response.at(frequency).ok_or_else(|| {
            let (low, high) = self.band();
            GrandError::OutOfRange(format!(
                "frequency {} Hz outside the tabulated band [{}, {}]",
                frequency, low, high
            ))
        })
    }

    /// Interpolate the table over direction once for all frequencies.
    pub fn directional_response(&self, direction: [f64; 3]) -> GrandResult<DirectionalResponse<'_>> {
        let (theta, phi) = direction_angles(direction)?;

        let (it, wt) = locate(&self.theta, theta).ok_or_else(|| {
            GrandError::OutOfRange(format!(
                "zenith angle {:.3} deg outside the tabulated range [{}, {}]",
                theta,
                self.theta[0],
                self.theta[self.theta.len() - 1]
            ))
        })?;
        let (ip0, ip1, wp) = self.locate_phi(phi).ok_or_else(|| {
            GrandError::OutOfRange(format!(
                "azimuth {:.3} deg outside the tabulated range [{}, {}]",
                phi,
                self.phi[0],
                self.phi[self.phi.len() - 1]
            ))
        })?;
        let it1 = (it + 1).min(self.theta.len() - 1);

        let corners = [
            (it, ip0, (1.0 - wt) * (1.0 - wp)),
            (it1, ip0, wt * (1.0 - wp)),
            (it, ip1, (1.0 - wt) * wp),
            (it1, ip1, wt * wp),
        ];
        let interpolate = |table: &Array3<Complex64>, f: usize| -> Complex64 {
            corners
                .iter()
                .map(|&(t, p, weight)| weight * table[[f, t, p]])
                .sum()
        };

        let (sin_t, cos_t) = theta.to_radians().sin_cos();
        let (sin_p, cos_p) = phi.to_radians().sin_cos();
        let values = (0..self.frequency.len())
            .map(|f| {
                let lt = interpolate(&self.leff_theta, f);
                let lp = interpolate(&self.leff_phi, f);
                [
                    lt * (cos_t * cos_p) - lp * sin_p,
                    lt * (cos_t * sin_p) + lp * cos_p,
                    lt * (-sin_t),
                ]
            })
            .collect();

        Ok(DirectionalResponse {
            frequency: &self.frequency,
            values,
        })
    }

    /// Bracketing phi indices and weight, wrapping across 360 when the grid
    /// is periodic.
    fn locate_phi(&self, phi: f64) -> Option<(usize, usize, f64)> {
        let first = self.phi[0];
        let last = self.phi[self.phi.len() - 1];
        let phi = first + (phi - first).rem_euclid(FULL_TURN);

        if let Some((index, weight)) = locate(&self.phi, phi) {
            let next = (index + 1).min(self.phi.len() - 1);
            return Some((index, next, weight));
        }
        if self.phi_periodic {
            let span = first + FULL_TURN - last;
            return Some((self.phi.len() - 1, 0, (phi - last) / span));
        }
        None
    }
}

impl<'a> DirectionalResponse<'a> {
    /// Linear interpolation in frequency, `None` outside the band.
    pub fn at(&self, frequency: f64) -> Option<[Complex64; 3]> {
        let (index, weight) = locate(self.frequency, frequency)?;
        let next = (index + 1).min(self.values.len() - 1);
        let (a, b) = (self.values[index], self.values[next]);
        Some([
            a[0] * (1.0 - weight) + b[0] * weight,
            a[1] * (1.0 - weight) + b[1] * weight,
            a[2] * (1.0 - weight) + b[2] * weight,
        ])
    }
}

/// Zenith angle from +z and azimuth from +x in [0, 360), both in degrees.
pub fn direction_angles(direction: [f64; 3]) -> GrandResult<(f64, f64)> {
    let [x, y, z] = direction;
    let norm = (x * x + y * y + z * z).sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(GrandError::Domain(format!(
            "direction {:?} has no orientation",
            direction
        )));
    }
    let theta = (z / norm).clamp(-1.0, 1.0).acos().to_degrees();
    let phi = y.atan2(x).to_degrees().rem_euclid(FULL_TURN);
    Ok((theta, phi))
}

/// Lower bracketing index and fractional weight of `value` in an increasing
/// grid, or `None` when outside it.
fn locate(grid: &[f64], value: f64) -> Option<(usize, f64)> {
    let first = grid[0];
    let last = grid[grid.len() - 1];
    if !(value >= first - GRID_TOLERANCE && value <= last + GRID_TOLERANCE) {
        return None;
    }
    if grid.len() == 1 {
        return Some((0, 0.0));
    }
    let upper = grid.partition_point(|&node| node <= value).clamp(1, grid.len() - 1);
    let lower = upper - 1;
    let weight = ((value - grid[lower]) / (grid[upper] - grid[lower])).clamp(0.0, 1.0);
    Some((lower, weight))
}

fn is_full_turn(phi: &[f64]) -> bool {
    if phi.len() < 2 {
        return false;
    }
    let step = phi[1] - phi[0];
    let span = phi[phi.len() - 1] - phi[0];
    span < FULL_TURN && (span + step - FULL_TURN).abs() < 1e-6
}

fn check_grid(name: &str, grid: &[f64]) -> GrandResult<()> {
    if grid.is_empty() {
        return Err(GrandError::Configuration(format!("empty {} grid", name)));
    }
    if grid.iter().any(|v| !v.is_finite()) || grid.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(GrandError::Configuration(format!(
            "{} grid must be finite and strictly increasing",
            name
        )));
    }
    Ok(())
}

/// Amplitude in metres and phase in degrees to complex effective length.
fn to_complex(amplitude: Array3<f64>, phase: Array3<f64>) -> Array3<Complex64> {
    ndarray::Zip::from(&amplitude)
        .and(&phase)
        .map_collect(|&a, &p| Complex64::from_polar(a, p.to_radians()))
}

fn to_array(
    name: &str,
    values: &[Vec<Vec<f64>>],
    shape: (usize, usize, usize),
) -> GrandResult<Array3<f64>> {
    let mismatch = || {
        GrandError::Configuration(format!(
            "{} does not match the (frequency, theta, phi) grid {:?}",
            name, shape
        ))
    };
    if values.len() != shape.0
        || values
            .iter()
            .any(|plane| plane.len() != shape.1 || plane.iter().any(|row| row.len() != shape.2))
    {
        return Err(mismatch());
    }
    Ok(Array3::from_shape_fn(shape, |(f, t, p)| values[f][t][p]))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Upper hemisphere table with a theta response growing with frequency
    /// and a constant phi response.
    pub(crate) fn hemisphere_table() -> AntennaTable {
        let frequency = vec![50.0e6, 100.0e6, 150.0e6, 200.0e6];
        let theta: Vec<f64> = (0..=9).map(|i| i as f64 * 10.0).collect();
        let phi: Vec<f64> = (0..36).map(|i| i as f64 * 10.0).collect();
        let cube = |value: &dyn Fn(usize, usize, usize) -> f64| {
            (0..frequency.len())
                .map(|f| {
                    (0..theta.len())
                        .map(|t| (0..phi.len()).map(|p| value(f, t, p)).collect())
                        .collect()
                })
                .collect::<Vec<Vec<Vec<f64>>>>()
        };
        AntennaTable {
            arm: "EW".into(),
            leff_theta: cube(&|f, _, _| 1.0 + f as f64),
            phase_theta: cube(&|_, _, _| 0.0),
            leff_phi: cube(&|_, _, p| 0.5 + 0.01 * p as f64),
            phase_phi: cube(&|_, _, _| 90.0),
            frequency,
            theta,
            phi,
        }
    }

    #[test]
    fn zenith_response_maps_to_cartesian_axes() {
        let model = TabulatedAntennaModel::from_table(hemisphere_table()).unwrap();
        assert_eq!(model.frequencies().len(), 4);
        let leff = model.effective_length([0.0, 0.0, 1.0], 100.0e6).unwrap();
        // theta = phi = 0: x follows the theta polarisation, y the phi one.
        assert_abs_diff_eq!(leff[0].re, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(leff[0].im, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(leff[1].re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(leff[1].im, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(leff[2].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn frequency_is_interpolated_linearly() {
        let model = TabulatedAntennaModel::from_table(hemisphere_table()).unwrap();
        let leff = model.effective_length([0.0, 0.0, 1.0], 125.0e6).unwrap();
        assert_abs_diff_eq!(leff[0].re, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn phi_wraps_between_last_and_first_node() {
        let model = TabulatedAntennaModel::from_table(hemisphere_table()).unwrap();
        // phi = 355 deg sits halfway between the 350 node (0.85) and 0 (0.5).
        let (s, c) = 355f64.to_radians().sin_cos();
        let response = model.directional_response([c, s, 0.0]).unwrap();
        let leff = response.at(50.0e6).unwrap();
        // On the horizon the phi polarisation lies in the x-y plane.
        let horizontal = (leff[0].norm_sqr() + leff[1].norm_sqr()).sqrt();
        assert_abs_diff_eq!(horizontal, 0.675, epsilon = 1e-9);
    }

    #[test]
    fn below_horizon_is_out_of_range() {
        let model = TabulatedAntennaModel::from_table(hemisphere_table()).unwrap();
        let result = model.effective_length([1.0, 0.0, -0.2], 100.0e6);
        assert!(matches!(result, Err(GrandError::OutOfRange(_))));
    }

    #[test]
    fn frequency_outside_band_is_out_of_range() {
        let model = TabulatedAntennaModel::from_table(hemisphere_table()).unwrap();
        let result = model.effective_length([0.0, 0.0, 1.0], 10.0e6);
        assert!(matches!(result, Err(GrandError::OutOfRange(_))));
    }

    #[test]
    fn phase_crossing_half_turn_keeps_its_sign() {
        let mut table = hemisphere_table();
        for plane in table.leff_theta.iter_mut() {
            for row in plane.iter_mut() {
                row.iter_mut().for_each(|value| *value = 1.0);
            }
        }
        for plane in table.phase_theta.iter_mut() {
            plane[0].iter_mut().for_each(|value| *value = 170.0);
            plane[1].iter_mut().for_each(|value| *value = -170.0);
        }
        let model = TabulatedAntennaModel::from_table(table).unwrap();

        // Halfway between e^{i170} and e^{-i170}: the mean is cos(170) on
        // the real axis, not a phase of zero.
        let (sin_t, cos_t) = 5f64.to_radians().sin_cos();
        let leff = model.effective_length([sin_t, 0.0, cos_t], 100.0e6).unwrap();
        let expected = 170f64.to_radians().cos() * cos_t;
        assert_abs_diff_eq!(leff[0].re, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(leff[0].im, 0.0, epsilon = 1e-12);
        assert!(leff[0].re < -0.9);
    }

    #[test]
    fn null_direction_is_a_domain_error() {
        let model = TabulatedAntennaModel::from_table(hemisphere_table()).unwrap();
        let result = model.effective_length([0.0, 0.0, 0.0], 100.0e6);
        assert!(matches!(result, Err(GrandError::Domain(_))));
    }

    #[test]
    fn partial_phi_grid_is_not_wrapped() {
        let mut table = hemisphere_table();
        table.phi.truncate(10);
        for cube in [
            &mut table.leff_theta,
            &mut table.phase_theta,
            &mut table.leff_phi,
            &mut table.phase_phi,
        ] {
            for plane in cube.iter_mut() {
                for row in plane.iter_mut() {
                    row.truncate(10);
                }
            }
        }
        let model = TabulatedAntennaModel::from_table(table).unwrap();
        assert!(model.effective_length([1.0, 0.5, 1.0], 100.0e6).is_ok());
        assert!(matches!(
            model.effective_length([-1.0, -1.0, 1.0], 100.0e6),
            Err(GrandError::OutOfRange(_))
        ));
    }

    #[test]
    fn load_reads_json_and_reports_problems() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&hemisphere_table()).unwrap().as_bytes())
            .unwrap();
        let model = TabulatedAntennaModel::load(file.path()).unwrap();
        assert_eq!(model.arm(), "EW");
        assert_eq!(model.band(), (50.0e6, 200.0e6));

        assert!(matches!(
            TabulatedAntennaModel::load("/nonexistent/table.json"),
            Err(GrandError::MissingData(_))
        ));

        let mut broken = hemisphere_table();
        broken.leff_phi.pop();
        assert!(matches!(
            TabulatedAntennaModel::from_table(broken),
            Err(GrandError::Configuration(_))
        ));

        let mut unsorted = hemisphere_table();
        unsorted.theta.swap(1, 2);
        assert!(matches!(
            TabulatedAntennaModel::from_table(unsorted),
            Err(GrandError::Configuration(_))
        ));
    }
}
