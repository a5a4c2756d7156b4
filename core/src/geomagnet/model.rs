use crate::coordinates::GeodeticPosition;
use crate::geomagnet::GeomagneticField;
use crate::prelude::{GrandError, GrandResult};
use chrono::{Datelike, NaiveDate};
use log::debug;
use std::fs;
use std::path::Path;

/// Geomagnetic reference radius (m).
const REFERENCE_RADIUS: f64 = 6371200.0;
/// Years after the epoch for which secular variation is trusted.
const VALIDITY_YEARS: f64 = 5.0;
/// Altitude range of the model (m).
const ALTITUDE_RANGE: (f64, f64) = (-1.0e3, 850.0e3);

/// Spherical harmonic coefficients with secular variation, read from a
/// WMM-style `.COF` file.
#[derive(Debug, Clone)]
pub struct MagneticModel {
    name: String,
    epoch: f64,
    order: usize,
    g: Vec<Vec<f64>>,
    h: Vec<Vec<f64>>,
    dg: Vec<Vec<f64>>,
    dh: Vec<Vec<f64>>,
}

/// Model coefficients propagated to a given day.
#[derive(Debug, Clone)]
pub struct Snapshot {
    model: String,
    date: NaiveDate,
    order: usize,
    g: Vec<Vec<f64>>,
    h: Vec<Vec<f64>>,
}

/// One `n m g h dg dh` coefficient line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    pub n: usize,
    pub m: usize,
    pub g: f64,
    pub h: f64,
    pub dg: f64,
    pub dh: f64,
}

impl MagneticModel {
    pub fn load<P: AsRef<Path>>(path: P) -> GrandResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| {
            GrandError::MissingData(format!(
                "geomagnetic model {}: {}",
                path.display(),
                err
            ))
        })?;
        let model = Self::parse(&contents)?;
        debug!(
            "Loaded geomagnetic model {} (epoch {}, order {}) from {}",
            model.name,
            model.epoch,
            model.order,
            path.display()
        );
        Ok(model)
    }

    /// Parse the text of a `.COF` file: an `epoch name date` header followed
    /// by coefficient lines, optionally closed by a line of nines.
    pub fn parse(contents: &str) -> GrandResult<Self> {
        let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| GrandError::Configuration("empty geomagnetic model".into()))?;
        let mut fields = header.split_whitespace();
        let epoch = fields
            .next()
            .and_then(|value| value.parse::<f64>().ok())
            .ok_or_else(|| {
                GrandError::Configuration(format!("invalid model header '{}'", header.trim()))
            })?;
        let name = fields.next().unwrap_or("unnamed").to_string();

        let mut coefficients = Vec::new();
        for line in lines {
            let trimmed = line.trim();
            if trimmed.starts_with("9999") {
                break;
            }
            let values: Vec<&str> = trimmed.split_whitespace().collect();
            if values.len() < 6 {
                return Err(GrandError::Configuration(format!(
                    "invalid coefficient line '{}'",
                    trimmed
                )));
            }
            let parse_index = |value: &str| {
                value.parse::<usize>().map_err(|_| {
                    GrandError::Configuration(format!("invalid coefficient line '{}'", trimmed))
                })
            };
            let parse_value = |value: &str| {
                value.parse::<f64>().map_err(|_| {
                    GrandError::Configuration(format!("invalid coefficient line '{}'", trimmed))
                })
            };
            coefficients.push(Coefficient {
                n: parse_index(values[0])?,
                m: parse_index(values[1])?,
                g: parse_value(values[2])?,
                h: parse_value(values[3])?,
                dg: parse_value(values[4])?,
                dh: parse_value(values[5])?,
            });
        }

        Self::from_coefficients(&name, epoch, &coefficients)
    }

    pub fn from_coefficients(
        name: &str,
        epoch: f64,
        coefficients: &[Coefficient],
    ) -> GrandResult<Self> {
        let order = coefficients.iter().map(|c| c.n).max().unwrap_or(0);
        if order == 0 {
            return Err(GrandError::Configuration(format!(
                "geomagnetic model {} has no coefficients",
                name
            )));
        }

        let table = || vec![vec![0.0; order + 1]; order + 1];
        let (mut g, mut h, mut dg, mut dh) = (table(), table(), table(), table());
        for c in coefficients {
            if c.n == 0 || c.m > c.n {
                return Err(GrandError::Configuration(format!(
                    "invalid coefficient degree {} order {}",
                    c.n, c.m
                )));
            }
            g[c.n][c.m] = c.g;
            h[c.n][c.m] = c.h;
            dg[c.n][c.m] = c.dg;
            dh[c.n][c.m] = c.dh;
        }

        Ok(Self {
            name: name.to_string(),
            epoch,
            order,
            g,
            h,
            dg,
            dh,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Coefficients at `date`. Dates outside the model validity window are
    /// rejected.
    pub fn snapshot(&self, date: NaiveDate) -> GrandResult<Snapshot> {
        let year = decimal_year(date);
        let dt = year - self.epoch;
        if !(0.0..=VALIDITY_YEARS).contains(&dt) {
            return Err(GrandError::Configuration(format!(
                "date {} outside the validity of {} ({} to {})",
                date,
                self.name,
                self.epoch,
                self.epoch + VALIDITY_YEARS
            )));
        }

        let propagate = |base: &[Vec<f64>], rate: &[Vec<f64>]| -> Vec<Vec<f64>> {
            base.iter()
                .zip(rate.iter())
                .map(|(row, rate_row)| {
                    row.iter()
                        .zip(rate_row.iter())
                        .map(|(value, drift)| value + dt * drift)
                        .collect::<Vec<f64>>()
                })
                .collect()
        };

        Ok(Snapshot {
            model: self.name.clone(),
            date,
            order: self.order,
            g: propagate(&self.g, &self.dg),
            h: propagate(&self.h, &self.dh),
        })
    }
}

impl GeomagneticField for MagneticModel {
    fn field(&self, location: &GeodeticPosition, date: NaiveDate) -> GrandResult<[f64; 3]> {
        self.snapshot(date)?.field(location)
    }
}

impl Snapshot {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Altitude range of the model, in metres.
    pub fn altitude(&self) -> (f64, f64) {
        ALTITUDE_RANGE
    }

    /// Field in nT along local geographic (east, north, up).
    pub fn field(&self, location: &GeodeticPosition) -> GrandResult<[f64; 3]> {
        let (low, high) = self.altitude();
        if !(low..=high).contains(&location.height) {
            return Err(GrandError::Configuration(format!(
                "altitude {} m outside the range of {} [{}, {}]",
                location.height, self.model, low, high
            )));
        }
        let ecef = location.to_ecef()?;
        let r = ecef.norm();
        let latitude_gc = ecef.z.atan2(ecef.x.hypot(ecef.y));
        let cos_theta = latitude_gc.sin();
        let sin_theta = latitude_gc.cos();
        if sin_theta < 1e-10 {
            return Err(GrandError::Domain(format!(
                "geomagnetic field east component undefined at the pole {:?}",
                location
            )));
        }

        let (p, dp) = schmidt_legendre(self.order, cos_theta, sin_theta);
        let longitude = location.longitude.to_radians();
        let ratio = REFERENCE_RADIUS / r;

        let (mut north, mut east, mut down) = (0.0, 0.0, 0.0);
        for n in 1..=self.order {
            let factor = ratio.powi(n as i32 + 2);
            for m in 0..=n {
                let (sin_ml, cos_ml) = (m as f64 * longitude).sin_cos();
                let gh = self.g[n][m] * cos_ml + self.h[n][m] * sin_ml;
                north += factor * gh * dp[n][m];
                east += factor * m as f64 * (self.g[n][m] * sin_ml - self.h[n][m] * cos_ml)
                    * p[n][m]
                    / sin_theta;
                down -= factor * (n as f64 + 1.0) * gh * p[n][m];
            }
        }

        // Geocentric to geodetic tilt.
        let psi = latitude_gc - location.latitude.to_radians();
        let (sin_psi, cos_psi) = psi.sin_cos();
        let north_gd = north * cos_psi - down * sin_psi;
        let down_gd = north * sin_psi + down * cos_psi;

        Ok([east, north_gd, -down_gd])
    }
}

/// Schmidt semi-normalised associated Legendre functions and their
/// colatitude derivatives, indexed `[n][m]`.
fn schmidt_legendre(order: usize, cos_theta: f64, sin_theta: f64) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let mut p = vec![vec![0.0; order + 1]; order + 1];
    let mut dp = vec![vec![0.0; order + 1]; order + 1];
    p[0][0] = 1.0;

    for n in 1..=order {
        if n == 1 {
            p[1][1] = sin_theta;
            dp[1][1] = cos_theta;
        } else {
            let k = (1.0 - 1.0 / (2.0 * n as f64)).sqrt();
            p[n][n] = k * sin_theta * p[n - 1][n - 1];
            dp[n][n] = k * (cos_theta * p[n - 1][n - 1] + sin_theta * dp[n - 1][n - 1]);
        }

        for m in 0..n {
            let a = (2 * n - 1) as f64;
            let d = ((n * n - m * m) as f64).sqrt();
            let (b, p2, dp2) = if n >= 2 && m <= n - 2 {
                (
                    (((n - 1) * (n - 1) - m * m) as f64).sqrt(),
                    p[n - 2][m],
                    dp[n - 2][m],
                )
            } else {
                (0.0, 0.0, 0.0)
            };
            p[n][m] = (a * cos_theta * p[n - 1][m] - b * p2) / d;
            dp[n][m] = (a * (cos_theta * dp[n - 1][m] - sin_theta * p[n - 1][m]) - b * dp2) / d;
        }
    }

    (p, dp)
}

fn decimal_year(date: NaiveDate) -> f64 {
    let days_in_year = if NaiveDate::from_ymd_opt(date.year(), 12, 31)
        .map(|last| last.ordinal() == 366)
        .unwrap_or(false)
    {
        366.0
    } else {
        365.0
    };
    date.year() as f64 + (date.ordinal0() as f64) / days_in_year
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DIPOLE_COF: &str = "    2020.0            TEST-DIPOLE     01/01/2020
  1  0  -30000.0       0.0       10.0        0.0
  1  1   -1500.0    4600.0        0.0        0.0
  2  0   -2500.0       0.0        0.0        0.0
999999999999999999999999999999999999999999999999
";

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn dipole(g10: f64, h11: f64) -> MagneticModel {
        MagneticModel::from_coefficients(
            "dipole",
            2020.0,
            &[
                Coefficient { n: 1, m: 0, g: g10, h: 0.0, dg: 0.0, dh: 0.0 },
                Coefficient { n: 1, m: 1, g: 0.0, h: h11, dg: 0.0, dh: 0.0 },
            ],
        )
        .unwrap()
    }

    #[test]
    fn axial_dipole_points_north_at_equator() {
        let model = dipole(-30000.0, 0.0);
        let location = GeodeticPosition::ellipsoid(0.0, 0.0, 0.0);
        let [east, north, up] = model.field(&location, date(2020, 1, 1)).unwrap();
        let ratio: f64 = REFERENCE_RADIUS / 6378137.0;
        assert_abs_diff_eq!(east, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(north, 30000.0 * ratio.powi(3), epsilon = 1e-6);
        assert_abs_diff_eq!(up, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn axial_dipole_points_down_in_the_north() {
        let model = dipole(-30000.0, 0.0);
        let location = GeodeticPosition::ellipsoid(60.0, 30.0, 0.0);
        let [_, north, up] = model.field(&location, date(2020, 1, 1)).unwrap();
        assert!(north > 0.0);
        assert!(up < 0.0);
    }

    #[test]
    fn tilted_dipole_declination() {
        let h11 = -30000.0 * 5f64.to_radians().tan();
        let model = dipole(-30000.0, h11);
        let location = GeodeticPosition::ellipsoid(0.0, 0.0, 0.0);
        let declination = model.declination(&location, date(2020, 1, 1)).unwrap();
        assert_abs_diff_eq!(declination, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn legendre_matches_closed_forms() {
        let theta: f64 = 0.7;
        let (s, c) = theta.sin_cos();
        let (p, dp) = schmidt_legendre(2, c, s);
        assert_abs_diff_eq!(p[1][0], c, epsilon = 1e-15);
        assert_abs_diff_eq!(p[2][0], 1.5 * c * c - 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(p[2][1], 3f64.sqrt() * s * c, epsilon = 1e-15);
        assert_abs_diff_eq!(p[2][2], 3f64.sqrt() / 2.0 * s * s, epsilon = 1e-15);
        assert_abs_diff_eq!(dp[2][0], -3.0 * c * s, epsilon = 1e-14);
        assert_abs_diff_eq!(dp[2][2], 3f64.sqrt() * s * c, epsilon = 1e-14);
    }

    #[test]
    fn parse_and_propagate_coefficients() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DIPOLE_COF.as_bytes()).unwrap();
        let model = MagneticModel::load(file.path()).unwrap();
        assert_eq!(model.name(), "TEST-DIPOLE");
        assert_eq!(model.order(), 2);
        assert_abs_diff_eq!(model.epoch(), 2020.0);

        let snapshot = model.snapshot(date(2022, 1, 1)).unwrap();
        assert_eq!(snapshot.model(), "TEST-DIPOLE");
        assert_eq!(snapshot.altitude(), (-1.0e3, 850.0e3));
        assert_eq!(snapshot.order(), 2);
        // 2020 is a leap year, so 2022-01-01 is exactly two years later.
        assert_abs_diff_eq!(snapshot.g[1][0], -29980.0, epsilon = 1e-9);
        assert_abs_diff_eq!(snapshot.h[1][1], 4600.0, epsilon = 1e-9);
    }

    #[test]
    fn date_outside_validity_is_rejected() {
        let model = MagneticModel::parse(DIPOLE_COF).unwrap();
        assert!(matches!(
            model.snapshot(date(2019, 6, 1)),
            Err(GrandError::Configuration(_))
        ));
        assert!(matches!(
            model.snapshot(date(2026, 1, 1)),
            Err(GrandError::Configuration(_))
        ));
    }

    #[test]
    fn missing_file_and_bad_lines() {
        assert!(matches!(
            MagneticModel::load("/nonexistent/WMM.COF"),
            Err(GrandError::MissingData(_))
        ));
        assert!(matches!(
            MagneticModel::parse("2020.0 X\n 1 0 abc 0 0 0\n"),
            Err(GrandError::Configuration(_))
        ));
        assert!(matches!(
            MagneticModel::parse("2020.0 X\n 1 2 1.0 0 0 0\n"),
            Err(GrandError::Configuration(_))
        ));
    }

    #[test]
    fn pole_is_outside_the_domain() {
        let model = dipole(-30000.0, 0.0);
        let location = GeodeticPosition::ellipsoid(90.0, 0.0, 0.0);
        assert!(matches!(
            model.field(&location, date(2020, 1, 1)),
            Err(GrandError::Domain(_))
        ));
    }

    #[test]
    fn altitude_outside_model_range_is_rejected() {
        let model = dipole(-30000.0, 0.0);
        let snapshot = model.snapshot(date(2020, 1, 1)).unwrap();
        for height in [-2.0e3, 900.0e3] {
            let location = GeodeticPosition::ellipsoid(45.0, 0.0, height);
            assert!(matches!(
                snapshot.field(&location),
                Err(GrandError::Configuration(_))
            ));
        }
        let orbit_edge = GeodeticPosition::ellipsoid(45.0, 0.0, 850.0e3);
        assert!(snapshot.field(&orbit_edge).is_ok());
    }
}
