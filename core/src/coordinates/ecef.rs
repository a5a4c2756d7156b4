use crate::coordinates::geodetic::{
    prime_vertical_radius, wgs84, GeodeticPosition, GeoidModel, NoGeoid, Reference,
};
use crate::prelude::{GrandError, GrandResult};
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 32;
const LATITUDE_TOLERANCE: f64 = 1e-14;
/// Below this distance from the Earth centre the latitude is undefined.
const MIN_RADIUS: f64 = 1.0;

/// Earth-centred Earth-fixed Cartesian position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcefPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EcefPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn to_geodetic(&self, reference: Reference) -> GrandResult<GeodeticPosition> {
        self.to_geodetic_with(reference, &NoGeoid)
    }

    /// Iterates `tan φ = (z + e² N sin φ) / p` to convergence.
    pub fn to_geodetic_with(
        &self,
        reference: Reference,
        geoid: &dyn GeoidModel,
    ) -> GrandResult<GeodeticPosition> {
        if !(self.x.is_finite() && self.y.is_finite() && self.z.is_finite()) {
            return Err(GrandError::Domain(format!(
                "non-finite ECEF coordinates {:?}",
                self
            )));
        }
        if self.norm() < MIN_RADIUS {
            return Err(GrandError::Domain(format!(
                "ECEF position {:?} is at the Earth centre",
                self
            )));
        }

        let p = self.x.hypot(self.y);
        let longitude = self.y.atan2(self.x);
        let mut latitude = self.z.atan2(p * (1.0 - wgs84::E2));

        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            let sin_lat = latitude.sin();
            let n = prime_vertical_radius(sin_lat);
            let next = (self.z + wgs84::E2 * n * sin_lat).atan2(p);
            let delta = (next - latitude).abs();
            latitude = next;
            if delta < LATITUDE_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(GrandError::Domain(format!(
                "latitude iteration did not converge for {:?}",
                self
            )));
        }

        let (sin_lat, cos_lat) = latitude.sin_cos();
        let height =
            p * cos_lat + self.z * sin_lat - wgs84::A * (1.0 - wgs84::E2 * sin_lat * sin_lat).sqrt();

        let geodetic =
            GeodeticPosition::ellipsoid(latitude.to_degrees(), longitude.to_degrees(), height);
        Ok(geodetic.with_reference(reference, geoid))
    }
}
