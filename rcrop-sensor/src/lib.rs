pub mod calibration_projector;

pub use calibration_projector::{Calibration, CalibrationProjector};
