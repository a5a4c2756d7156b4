//! Geodetic, ECEF and local tangent plane coordinates.

pub mod ecef;
pub mod frame;
pub mod geodetic;
pub mod ltp;
pub mod position;

pub use ecef::EcefPosition;
pub use frame::{Direction, LocalFrame, Orientation};
pub use geodetic::{GeodeticPosition, GeoidModel, NoGeoid, Reference};
pub use ltp::{rotate_components, LtpPoint, LtpVector};
pub use position::Position;
