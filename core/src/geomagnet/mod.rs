//! Geomagnetic field queries used to align frames on magnetic north.

pub mod model;

pub use model::{MagneticModel, Snapshot};

use crate::coordinates::GeodeticPosition;
use crate::prelude::{GrandError, GrandResult};
use chrono::NaiveDate;

/// Source of the geomagnetic field vector at a location and date.
pub trait GeomagneticField: Send + Sync {
    /// Field in nT along the local geographic (east, north, up) axes.
    fn field(&self, location: &GeodeticPosition, date: NaiveDate) -> GrandResult<[f64; 3]>;

    /// Angle from true north to the horizontal field, in degrees, positive
    /// toward east.
    fn declination(&self, location: &GeodeticPosition, date: NaiveDate) -> GrandResult<f64> {
        let [east, north, _] = self.field(location, date)?;
        if east == 0.0 && north == 0.0 {
            return Err(GrandError::Domain(format!(
                "vanishing horizontal field at {:?}",
                location
            )));
        }
        Ok(east.atan2(north).to_degrees())
    }
}

/// Same field vector everywhere and at all times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformField {
    enu: [f64; 3],
}

impl UniformField {
    pub fn new(enu: [f64; 3]) -> Self {
        Self { enu }
    }

    /// Unit horizontal field with the given declination in degrees.
    pub fn from_declination(declination: f64) -> Self {
        let (sin_d, cos_d) = declination.to_radians().sin_cos();
        Self::new([sin_d, cos_d, 0.0])
    }

    /// Field from declination, inclination (degrees, positive downward) and
    /// total intensity in nT.
    pub fn from_angles(declination: f64, inclination: f64, intensity: f64) -> Self {
        let (sin_d, cos_d) = declination.to_radians().sin_cos();
        let (sin_i, cos_i) = inclination.to_radians().sin_cos();
        let horizontal = intensity * cos_i;
        Self::new([horizontal * sin_d, horizontal * cos_d, -intensity * sin_i])
    }
}

impl GeomagneticField for UniformField {
    fn field(&self, _location: &GeodeticPosition, _date: NaiveDate) -> GrandResult<[f64; 3]> {
        Ok(self.enu)
    }
}
