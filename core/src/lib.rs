//! Coordinate frames and antenna response core for GRAND radio simulations.
//!
//! Positions move between geodetic, ECEF and local tangent plane frames
//! through explicit conversions. Antennas combine a shared tabulated response
//! with an oriented local frame and turn shower electric fields into voltages.

pub mod antenna;
pub mod coordinates;
pub mod geomagnet;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod shower;
pub mod telemetry;

pub use prelude::{GrandError, GrandResult};
