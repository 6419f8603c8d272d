use rcrop_core::{ImageCoordinates, PointCoordinates, ProjectedPoint, Projector, Real};
use sophus::nalgebra::{Matrix3, Matrix3x4, Matrix4, Matrix4xX, Vector2, Vector3};

/// Sensor calibration of one sequence.
///
/// `r_rect` and `tr_velo_to_cam` are homogeneous 4x4 transforms so that the
/// whole chain composes by plain multiplication.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub p_rect: Matrix3x4<Real>,
    pub r_rect: Matrix4<Real>,
    pub tr_velo_to_cam: Matrix4<Real>,
}

impl Calibration {
    pub fn new(
        p_rect: Matrix3x4<Real>,
        r_rect: &Matrix3<Real>,
        velo_to_cam_rotation: &Matrix3<Real>,
        velo_to_cam_translation: &Vector3<Real>,
    ) -> Self {
        Self {
            p_rect,
            r_rect: homogeneous_rotation(r_rect),
            tr_velo_to_cam: rigid_transform(velo_to_cam_rotation, velo_to_cam_translation),
        }
    }
}

/// Embeds `r` in the top-left block of a 4x4 identity.
pub fn homogeneous_rotation(r: &Matrix3<Real>) -> Matrix4<Real> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(r);
    m
}

/// `[r | t]` stacked on `[0, 0, 0, 1]`.
pub fn rigid_transform(r: &Matrix3<Real>, t: &Vector3<Real>) -> Matrix4<Real> {
    let mut m = homogeneous_rotation(r);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    m
}

/// Projects LIDAR-frame points into rectified image pixels.
#[derive(Clone, Debug)]
pub struct CalibrationProjector {
    calibration: Calibration,
    // R_rect * Tr_velo_to_cam
    lidar_to_rect: Matrix4<Real>,
}

impl CalibrationProjector {
    pub fn new(calibration: Calibration) -> Self {
        let lidar_to_rect = calibration.r_rect * calibration.tr_velo_to_cam;
        Self {
            calibration,
            lidar_to_rect,
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn lidar_to_rect(&self) -> &Matrix4<Real> {
        &self.lidar_to_rect
    }

    /// The full chain `P_rect * R_rect * Tr_velo_to_cam`.
    pub fn lidar_to_image(&self) -> Matrix3x4<Real> {
        self.calibration.p_rect * self.lidar_to_rect
    }

    /// Sensor-frame point whose projection is `pixel` with homogeneous scale
    /// `depth`. `None` if the chain cannot be inverted.
    pub fn unproject(&self, pixel: &ImageCoordinates, depth: Real) -> Option<PointCoordinates> {
        let p = &self.calibration.p_rect;
        let m = p.fixed_view::<3, 3>(0, 0).into_owned().try_inverse()?;
        let scaled = Vector3::new(pixel.x * depth, pixel.y * depth, depth);
        let rect = m * (scaled - p.column(3));

        let rect_to_lidar = self.lidar_to_rect.try_inverse()?;
        let lidar = rect_to_lidar * rect.push(1.0);
        Some(lidar.xyz() / lidar.w)
    }
}

impl Projector for CalibrationProjector {
    fn project_with_depth(&self, points: &[PointCoordinates]) -> Vec<ProjectedPoint> {
        let homogeneous: Vec<_> = points.iter().map(|p| p.push(1.0)).collect();
        if homogeneous.is_empty() {
            return vec![];
        }
        let homogeneous = Matrix4xX::from_columns(&homogeneous);

        let rect = self.lidar_to_rect * homogeneous;
        let proj = self.calibration.p_rect * rect;

        proj.column_iter()
            .map(|c| ProjectedPoint {
                pixel: Vector2::new(c[0] / c[2], c[1] / c[2]),
                depth: c[2],
            })
            .collect()
    }
}
