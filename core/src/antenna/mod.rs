//! Antenna response model and voltage computation.

pub mod field;
pub mod model;
pub mod voltage;

pub use field::{ElectricField, Voltage};
pub use model::{AntennaTable, DirectionalResponse, TabulatedAntennaModel};
pub use voltage::Antenna;
