use crate::coordinates::ecef::EcefPosition;
use crate::prelude::{GrandError, GrandResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WGS84 reference ellipsoid.
pub mod wgs84 {
    /// Semi-major axis (m).
    pub const A: f64 = 6378137.0;
    /// Flattening.
    pub const F: f64 = 1.0 / 298.257223563;
    /// Semi-minor axis (m).
    pub const B: f64 = A * (1.0 - F);
    /// First eccentricity squared.
    pub const E2: f64 = F * (2.0 - F);
}

/// Surface that a geodetic height is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Reference {
    Ellipsoid,
    Geoid,
}

impl FromStr for Reference {
    type Err = GrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ELLIPSOID" => Ok(Reference::Ellipsoid),
            "GEOID" => Ok(Reference::Geoid),
            other => Err(GrandError::Configuration(format!(
                "invalid reference surface '{}', expected ELLIPSOID or GEOID",
                other
            ))),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Ellipsoid => write!(f, "ELLIPSOID"),
            Reference::Geoid => write!(f, "GEOID"),
        }
    }
}

/// Geoid undulation N(lat, lon): height of the geoid above the ellipsoid.
pub trait GeoidModel {
    fn undulation(&self, latitude: f64, longitude: f64) -> f64;
}

/// Geoid coinciding with the ellipsoid. Used when no geoid grid is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoid;

impl GeoidModel for NoGeoid {
    fn undulation(&self, _latitude: f64, _longitude: f64) -> f64 {
        0.0
    }
}

/// Latitude and longitude in degrees, height in metres above `reference`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
    pub reference: Reference,
}

impl GeodeticPosition {
    pub fn new(latitude: f64, longitude: f64, height: f64, reference: Reference) -> Self {
        Self {
            latitude,
            longitude,
            height,
            reference,
        }
    }

    pub fn ellipsoid(latitude: f64, longitude: f64, height: f64) -> Self {
        Self::new(latitude, longitude, height, Reference::Ellipsoid)
    }

    pub fn to_ecef(&self) -> GrandResult<EcefPosition> {
        self.to_ecef_with(&NoGeoid)
    }

    /// Closed-form ellipsoidal conversion. Geoid heights are lifted to the
    /// ellipsoid with `geoid` first.
    pub fn to_ecef_with(&self, geoid: &dyn GeoidModel) -> GrandResult<EcefPosition> {
        if !(self.latitude.is_finite() && self.longitude.is_finite() && self.height.is_finite()) {
            return Err(GrandError::Domain(format!(
                "non-finite geodetic coordinates {:?}",
                self
            )));
        }
        if self.latitude.abs() > 90.0 {
            return Err(GrandError::Domain(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }

        let height = self.ellipsoidal_height(geoid);
        let (sin_lat, cos_lat) = self.latitude.to_radians().sin_cos();
        let (sin_lon, cos_lon) = self.longitude.to_radians().sin_cos();
        let n = prime_vertical_radius(sin_lat);

        Ok(EcefPosition::new(
            (n + height) * cos_lat * cos_lon,
            (n + height) * cos_lat * sin_lon,
            (n * (1.0 - wgs84::E2) + height) * sin_lat,
        ))
    }

    /// Same location with its height re-expressed against `reference`.
    pub fn with_reference(&self, reference: Reference, geoid: &dyn GeoidModel) -> Self {
        let ellipsoidal = self.ellipsoidal_height(geoid);
        let height = match reference {
            Reference::Ellipsoid => ellipsoidal,
            Reference::Geoid => ellipsoidal - geoid.undulation(self.latitude, self.longitude),
        };
        Self {
            height,
            reference,
            ..*self
        }
    }

    fn ellipsoidal_height(&self, geoid: &dyn GeoidModel) -> f64 {
        match self.reference {
            Reference::Ellipsoid => self.height,
            Reference::Geoid => self.height + geoid.undulation(self.latitude, self.longitude),
        }
    }
}

pub(crate) fn prime_vertical_radius(sin_lat: f64) -> f64 {
    wgs84::A / (1.0 - wgs84::E2 * sin_lat * sin_lat).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct ConstantGeoid(f64);

    impl GeoidModel for ConstantGeoid {
        fn undulation(&self, _latitude: f64, _longitude: f64) -> f64 {
            self.0
        }
    }

    #[test]
    fn equator_maps_to_semi_major_axis() {
        let ecef = GeodeticPosition::ellipsoid(0.0, 0.0, 0.0).to_ecef().unwrap();
        assert!(((ecef.x - 6378137.0) / 6378137.0).abs() < 1e-6);
        assert_abs_diff_eq!(ecef.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ecef.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn pole_maps_to_semi_minor_axis() {
        let ecef = GeodeticPosition::ellipsoid(90.0, 0.0, 0.0).to_ecef().unwrap();
        assert_abs_diff_eq!(ecef.z, wgs84::B, epsilon = 1e-6);
    }

    #[test]
    fn reference_parsing_rejects_unknown_surface() {
        assert_eq!("geoid".parse::<Reference>().unwrap(), Reference::Geoid);
        assert_eq!("ELLIPSOID".parse::<Reference>().unwrap(), Reference::Ellipsoid);
        assert!(matches!(
            "SPHERE".parse::<Reference>(),
            Err(GrandError::Configuration(_))
        ));
    }

    #[test]
    fn geoid_height_is_offset_by_undulation() {
        let geoid = ConstantGeoid(30.0);
        let above_geoid = GeodeticPosition::new(42.0, 86.0, 100.0, Reference::Geoid);
        let above_ellipsoid = GeodeticPosition::ellipsoid(42.0, 86.0, 130.0);
        let a = above_geoid.to_ecef_with(&geoid).unwrap();
        let b = above_ellipsoid.to_ecef().unwrap();
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.z, b.z, epsilon = 1e-9);

        let converted = above_geoid.with_reference(Reference::Ellipsoid, &geoid);
        assert_eq!(converted, above_ellipsoid);
    }

    #[test]
    fn default_geoid_has_zero_undulation() {
        let g = GeodeticPosition::new(10.0, 20.0, 5.0, Reference::Geoid);
        let e = GeodeticPosition::ellipsoid(10.0, 20.0, 5.0);
        assert_eq!(g.to_ecef().unwrap(), e.to_ecef().unwrap());
    }

    #[test]
    fn invalid_latitude_is_a_domain_error() {
        let result = GeodeticPosition::ellipsoid(91.0, 0.0, 0.0).to_ecef();
        assert!(matches!(result, Err(GrandError::Domain(_))));
    }
}
