use crate::{ImageCoordinates, PointCoordinates, Real};

/// A pixel together with the homogeneous scale it was divided by.
///
/// For a rectified pinhole chain the scale is the depth along the optical
/// axis, so a non-positive value means the point lies behind the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPoint {
    pub pixel: ImageCoordinates,
    pub depth: Real,
}

impl ProjectedPoint {
    pub fn is_in_front(&self) -> bool {
        self.depth > 0.0
    }
}

/// Maps sensor-frame points to image pixels.
pub trait Projector {
    fn project_with_depth(&self, points: &[PointCoordinates]) -> Vec<ProjectedPoint>;

    /// Pixels in input order. No bounds or depth checks are applied.
    fn project(&self, points: &[PointCoordinates]) -> Vec<ImageCoordinates> {
        self.project_with_depth(points)
            .into_iter()
            .map(|p| p.pixel)
            .collect()
    }
}
