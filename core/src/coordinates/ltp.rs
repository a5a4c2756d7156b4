use crate::coordinates::ecef::EcefPosition;
use crate::coordinates::frame::LocalFrame;
use crate::math::matrix::{add, sub, MatrixHelper};
use std::sync::Arc;

/// Position expressed in a local tangent plane frame, in metres.
#[derive(Debug, Clone)]
pub struct LtpPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    frame: Arc<LocalFrame>,
}

/// Displacement or field vector expressed in a local tangent plane frame.
/// Unlike [`LtpPoint`] it ignores the frame origin.
#[derive(Debug, Clone)]
pub struct LtpVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    frame: Arc<LocalFrame>,
}

impl LtpPoint {
    pub fn new(x: f64, y: f64, z: f64, frame: Arc<LocalFrame>) -> Self {
        Self { x, y, z, frame }
    }

    pub fn from_array(v: [f64; 3], frame: Arc<LocalFrame>) -> Self {
        Self::new(v[0], v[1], v[2], frame)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn frame(&self) -> &Arc<LocalFrame> {
        &self.frame
    }

    /// `origin + basis · local`.
    pub fn to_ecef(&self) -> EcefPosition {
        let offset = MatrixHelper::apply(self.frame.basis(), self.to_array());
        EcefPosition::from_array(add(self.frame.origin_ecef().to_array(), offset))
    }

    /// `basisᵀ · (ecef - origin)`.
    pub fn from_ecef(position: &EcefPosition, frame: Arc<LocalFrame>) -> Self {
        let offset = sub(position.to_array(), frame.origin_ecef().to_array());
        let local = MatrixHelper::apply_transpose(frame.basis(), offset);
        Self::from_array(local, frame)
    }

    /// Re-express the point in `target`, going through ECEF unless both
    /// frames are the same.
    pub fn transform_to(&self, target: &Arc<LocalFrame>) -> Self {
        if Arc::ptr_eq(&self.frame, target) || *self.frame == **target {
            return Self::from_array(self.to_array(), Arc::clone(target));
        }
        Self::from_ecef(&self.to_ecef(), Arc::clone(target))
    }

    /// Displacement from `other` to `self`, in the frame of `self`.
    pub fn displacement_from(&self, other: &LtpPoint) -> LtpVector {
        let other = other.transform_to(&self.frame);
        LtpVector::from_array(sub(self.to_array(), other.to_array()), Arc::clone(&self.frame))
    }
}

impl LtpVector {
    pub fn new(x: f64, y: f64, z: f64, frame: Arc<LocalFrame>) -> Self {
        Self { x, y, z, frame }
    }

    pub fn from_array(v: [f64; 3], frame: Arc<LocalFrame>) -> Self {
        Self::new(v[0], v[1], v[2], frame)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn frame(&self) -> &Arc<LocalFrame> {
        &self.frame
    }

    /// ECEF components, without any translation.
    pub fn to_ecef(&self) -> [f64; 3] {
        MatrixHelper::apply(self.frame.basis(), self.to_array())
    }

    pub fn from_ecef(components: [f64; 3], frame: Arc<LocalFrame>) -> Self {
        let local = MatrixHelper::apply_transpose(frame.basis(), components);
        Self::from_array(local, frame)
    }

    pub fn transform_to(&self, target: &Arc<LocalFrame>) -> Self {
        if Arc::ptr_eq(&self.frame, target) || *self.frame == **target {
            return Self::from_array(self.to_array(), Arc::clone(target));
        }
        Self::from_ecef(self.to_ecef(), Arc::clone(target))
    }
}

/// Express raw components given in `source` as components in `target`.
pub fn rotate_components(components: [f64; 3], source: &LocalFrame, target: &LocalFrame) -> [f64; 3] {
    if source == target {
        return components;
    }
    let ecef = MatrixHelper::apply(source.basis(), components);
    MatrixHelper::apply_transpose(target.basis(), ecef)
}
