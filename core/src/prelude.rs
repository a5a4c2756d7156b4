pub use crate::antenna::{Antenna, ElectricField, TabulatedAntennaModel, Voltage};
pub use crate::coordinates::{
    EcefPosition, GeodeticPosition, LocalFrame, LtpPoint, LtpVector, Orientation, Position,
    Reference,
};
pub use crate::geomagnet::{GeomagneticField, MagneticModel, UniformField};
pub use crate::shower::{ShowerEvent, ShowerGeometry};

/// Common error type for coordinate, geomagnetic and antenna computations.
#[derive(thiserror::Error, Debug)]
pub enum GrandError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("domain error: {0}")]
    Domain(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("missing data: {0}")]
    MissingData(String),
}

pub type GrandResult<T> = Result<T, GrandError>;
