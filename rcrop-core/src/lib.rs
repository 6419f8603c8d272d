mod dataset;
pub use dataset::*;
mod projector;
pub use projector::*;
pub mod box_geometry;
pub mod crop_rect;
pub mod tracklet;

use sophus::nalgebra::{Vector2, Vector3};

pub type Real = f64;
pub type PointCoordinates = Vector3<Real>;
pub type ImageCoordinates = Vector2<Real>;
