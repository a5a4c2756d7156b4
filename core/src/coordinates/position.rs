use crate::coordinates::ecef::EcefPosition;
use crate::coordinates::frame::LocalFrame;
use crate::coordinates::geodetic::{GeodeticPosition, Reference};
use crate::coordinates::ltp::LtpPoint;
use crate::prelude::GrandResult;
use std::sync::Arc;

/// A location in one of the supported reference frames.
#[derive(Debug, Clone)]
pub enum Position {
    Geodetic(GeodeticPosition),
    Ecef(EcefPosition),
    Ltp(LtpPoint),
}

impl Position {
    pub fn to_ecef(&self) -> GrandResult<EcefPosition> {
        match self {
            Position::Geodetic(geodetic) => geodetic.to_ecef(),
            Position::Ecef(ecef) => Ok(*ecef),
            Position::Ltp(point) => Ok(point.to_ecef()),
        }
    }

    pub fn to_geodetic(&self, reference: Reference) -> GrandResult<GeodeticPosition> {
        match self {
            Position::Geodetic(geodetic) if geodetic.reference == reference => Ok(*geodetic),
            other => other.to_ecef()?.to_geodetic(reference),
        }
    }

    pub fn to_ltp(&self, frame: &Arc<LocalFrame>) -> GrandResult<LtpPoint> {
        match self {
            Position::Ltp(point) => Ok(point.transform_to(frame)),
            other => Ok(LtpPoint::from_ecef(&other.to_ecef()?, Arc::clone(frame))),
        }
    }
}

impl From<GeodeticPosition> for Position {
    fn from(value: GeodeticPosition) -> Self {
        Position::Geodetic(value)
    }
}

impl From<EcefPosition> for Position {
    fn from(value: EcefPosition) -> Self {
        Position::Ecef(value)
    }
}

impl From<LtpPoint> for Position {
    fn from(value: LtpPoint) -> Self {
        Position::Ltp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::frame::Orientation;
    use approx::assert_abs_diff_eq;

    #[test]
    fn conversions_agree_between_variants() {
        let location = GeodeticPosition::ellipsoid(42.9, 86.7, 1200.0);
        let frame = Arc::new(LocalFrame::new(location, Orientation::NWU, None).unwrap());
        let point = LtpPoint::new(100.0, -50.0, 20.0, frame.clone());

        let from_ltp = Position::from(point.clone()).to_geodetic(Reference::Ellipsoid).unwrap();
        let via_ecef = Position::from(point.to_ecef());
        let back = via_ecef.to_ltp(&frame).unwrap();

        assert_abs_diff_eq!(back.x, 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.y, -50.0, epsilon = 1e-6);
        assert_abs_diff_eq!(back.z, 20.0, epsilon = 1e-6);

        let back = Position::from(from_ltp).to_ltp(&frame).unwrap();
        assert_abs_diff_eq!(back.x, 100.0, epsilon = 1e-5);
        assert_abs_diff_eq!(back.z, 20.0, epsilon = 1e-5);
    }
}
