//! Simulated air shower events and their electric fields.

pub mod coreas;

use crate::antenna::ElectricField;
use crate::coordinates::{GeodeticPosition, LocalFrame, LtpPoint, LtpVector, Reference};
use crate::prelude::{GrandError, GrandResult};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Shower parameters. Positions and vectors are expressed in the shower frame.
#[derive(Debug, Clone)]
pub struct ShowerGeometry {
    /// Primary energy in GeV.
    pub energy: f64,
    /// Zenith angle of the propagation direction, degrees.
    pub zenith: f64,
    /// Azimuth angle of the propagation direction, degrees.
    pub azimuth: f64,
    /// CORSIKA particle identifier of the primary.
    pub primary: i64,
    pub core: LtpPoint,
    /// Geomagnetic field in nT.
    pub geomagnet: LtpVector,
    /// Position of the shower maximum.
    pub maximum: LtpPoint,
}

/// A loaded shower: its frame, geometry and per-antenna fields.
#[derive(Debug, Clone)]
pub struct ShowerEvent {
    pub frame: Arc<LocalFrame>,
    pub geometry: ShowerGeometry,
    pub fields: BTreeMap<usize, ElectricField>,
}

impl ShowerEvent {
    /// Load the simulation stored under `path`. The simulation output does
    /// not record where the array sits, so the shower frame is supplied.
    pub fn load<P: AsRef<Path>>(path: P, frame: Arc<LocalFrame>) -> GrandResult<Self> {
        let path = path.as_ref();
        if coreas::is_coreas_dir(path) {
            return coreas::load(path, frame);
        }
        Err(GrandError::MissingData(format!(
            "no supported shower simulation found in {}",
            path.display()
        )))
    }

    /// Geodetic location of a position given in any local frame.
    pub fn realize_frame(&self, position: &LtpPoint) -> GrandResult<GeodeticPosition> {
        position.to_ecef().to_geodetic(Reference::Ellipsoid)
    }

    /// Direction from `position` toward the shower maximum, in the shower
    /// frame.
    pub fn arrival_direction(&self, position: &LtpPoint) -> LtpVector {
        self.geometry.maximum.displacement_from(position)
    }
}
