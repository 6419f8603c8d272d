use serde::Deserialize;
use sophus::nalgebra::{Rotation3, Vector3};

use crate::{PointCoordinates, Real};

/// Box extents, fixed over a tracklet's lifetime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxDimensions {
    pub h: Real,
    pub w: Real,
    pub l: Real,
}

impl BoxDimensions {
    pub fn new(h: Real, w: Real, l: Real) -> Self {
        Self { h, w, l }
    }
}

/// Center-bottom translation in the sensor frame and yaw about the up axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Pose {
    pub tx: Real,
    pub ty: Real,
    pub tz: Real,
    pub rz: Real,
}

/// One tracked instance of an object at one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectPose {
    pub dimensions: BoxDimensions,
    pub pose: Pose,
}

impl ObjectPose {
    pub fn corners(&self) -> Corners3D {
        let BoxDimensions { h, w, l } = self.dimensions;
        let Pose { tx, ty, tz, rz } = self.pose;
        corners(h, w, l, tx, ty, tz, rz)
    }
}

pub type Corners3D = [PointCoordinates; 8];

// bottom face first (front-right, front-left, rear-left, rear-right), then top
const CORNER_SIGNS: [(Real, Real, Real); 8] = [
    (1.0, 1.0, 0.0),
    (1.0, -1.0, 0.0),
    (-1.0, -1.0, 0.0),
    (-1.0, 1.0, 0.0),
    (1.0, 1.0, 1.0),
    (1.0, -1.0, 1.0),
    (-1.0, -1.0, 1.0),
    (-1.0, 1.0, 1.0),
];

/// Eight corners of a box of height `h`, width `w` and length `l` whose
/// bottom face is centered at `(tx, ty, tz)`, rotated by `rz` about z.
///
/// Dimensions are not validated; degenerate boxes give degenerate corners.
pub fn corners(h: Real, w: Real, l: Real, tx: Real, ty: Real, tz: Real, rz: Real) -> Corners3D {
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), rz);
    let translation = Vector3::new(tx, ty, tz);

    CORNER_SIGNS.map(|(sx, sy, sz)| {
        let local = Vector3::new(sx * l / 2.0, sy * w / 2.0, sz * h);
        rotation * local + translation
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn zero_yaw_gives_axis_aligned_box() {
        let (h, w, l) = (1.5, 1.6, 4.0);
        let (tx, ty, tz) = (3.0, -2.0, 0.5);
        let c = corners(h, w, l, tx, ty, tz, 0.0);

        for p in &c {
            assert!((p.x - (tx - l / 2.0)).abs() < 1e-12 || (p.x - (tx + l / 2.0)).abs() < 1e-12);
            assert!((p.y - (ty - w / 2.0)).abs() < 1e-12 || (p.y - (ty + w / 2.0)).abs() < 1e-12);
        }
        let min_x = c.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = c.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_z = c.iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
        let max_z = c.iter().map(|p| p.z).fold(f64::NEG_INFINITY, f64::max);
        assert_relative_eq!(min_x, 1.0);
        assert_relative_eq!(max_x, 5.0);
        assert_relative_eq!(min_z, tz);
        assert_relative_eq!(max_z, tz + h);
    }

    #[test]
    fn corner_order_is_bottom_then_top() {
        let c = corners(2.0, 2.0, 4.0, 0.0, 0.0, 0.0, 0.0);
        assert_relative_eq!(c[0], Vector3::new(2.0, 1.0, 0.0));
        assert_relative_eq!(c[1], Vector3::new(2.0, -1.0, 0.0));
        assert_relative_eq!(c[2], Vector3::new(-2.0, -1.0, 0.0));
        assert_relative_eq!(c[3], Vector3::new(-2.0, 1.0, 0.0));
        for i in 0..4 {
            assert_relative_eq!(c[i + 4], c[i] + Vector3::new(0.0, 0.0, 2.0));
        }
    }

    #[test]
    fn yaw_is_periodic() {
        let a = corners(1.7, 0.6, 0.8, 12.0, 4.0, -1.6, 0.37);
        let b = corners(1.7, 0.6, 0.8, 12.0, 4.0, -1.6, 0.37 + 2.0 * PI);
        for (p, q) in a.iter().zip(b.iter()) {
            assert_relative_eq!(*p, *q, epsilon = 1e-9);
        }
    }

    #[test]
    fn quarter_turn_swaps_length_and_width() {
        let c = corners(1.0, 2.0, 4.0, 0.0, 0.0, 0.0, FRAC_PI_2);
        // front-right (l/2, w/2) rotates to (-w/2, l/2)
        assert_relative_eq!(c[0], Vector3::new(-1.0, 2.0, 0.0), epsilon = 1e-12);
        let max_y = c.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        assert_relative_eq!(max_y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn object_pose_forwards_to_corners() {
        let object = ObjectPose {
            dimensions: BoxDimensions::new(1.5, 1.6, 4.0),
            pose: Pose {
                tx: 10.0,
                ty: 1.0,
                tz: -1.7,
                rz: 0.2,
            },
        };
        assert_eq!(object.corners(), corners(1.5, 1.6, 4.0, 10.0, 1.0, -1.7, 0.2));
    }
}
