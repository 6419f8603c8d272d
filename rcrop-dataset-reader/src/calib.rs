use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use rcrop_core::Real;
use rcrop_sensor::Calibration;
use sophus::nalgebra::{Matrix3, Matrix3x4, Vector3};
use thiserror::Error;

pub const CAM_TO_CAM_FILE: &str = "calib_cam_to_cam.txt";
pub const VELO_TO_CAM_FILE: &str = "calib_velo_to_cam.txt";

const R_RECT_LABEL: &str = "R_rect_00:";
const VELO_ROTATION_LABEL: &str = "R:";
const VELO_TRANSLATION_LABEL: &str = "T:";

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("calibration file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("malformed calibration {}: {label} {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        label: String,
        reason: String,
    },
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rows of a calibration file that start with a `LABEL:` token.
///
/// Yields `(label, values)` lazily, one per labeled line; other lines are
/// skipped.
pub struct LabeledRows<R> {
    lines: Lines<R>,
}

impl<R: BufRead> LabeledRows<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> Iterator for LabeledRows<R> {
    type Item = io::Result<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            let line = line.trim_start();
            let Some((label, rest)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            if label.ends_with(':') {
                return Some(Ok((label.to_owned(), rest.to_owned())));
            }
        }
    }
}

/// Scans `path` once and returns the first row for each of `labels`,
/// parsed as exactly the requested number of values.
fn read_rows(
    path: &Path,
    labels: &[(&str, usize)],
) -> Result<HashMap<String, Vec<Real>>, CalibrationError> {
    let io_error = |source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;

    let mut found = HashMap::new();
    for row in LabeledRows::new(BufReader::new(file)) {
        let (label, values) = row.map_err(io_error)?;
        let Some(&(_, expected)) = labels.iter().find(|(l, _)| *l == label) else {
            continue;
        };
        if found.contains_key(&label) {
            continue;
        }
        let values = parse_values(path, &label, &values, expected)?;
        found.insert(label, values);
        if found.len() == labels.len() {
            break;
        }
    }

    if let Some((label, _)) = labels.iter().find(|(l, _)| !found.contains_key(*l)) {
        return Err(malformed(path, label, "not found"));
    }
    Ok(found)
}

fn parse_values(
    path: &Path,
    label: &str,
    values: &str,
    expected: usize,
) -> Result<Vec<Real>, CalibrationError> {
    let values = values
        .split_whitespace()
        .map(|v| v.parse::<Real>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| malformed(path, label, &format!("has a non-numeric value: {e}")))?;
    if values.len() != expected {
        return Err(malformed(
            path,
            label,
            &format!("expected {expected} values, found {}", values.len()),
        ));
    }
    Ok(values)
}

fn malformed(path: &Path, label: &str, reason: &str) -> CalibrationError {
    CalibrationError::Malformed {
        path: path.to_path_buf(),
        label: label.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Rectified projection `P_rect_<camera>` and rectifying rotation `R_rect_00`.
pub fn read_cam_to_cam(
    path: &Path,
    camera: &str,
) -> Result<(Matrix3x4<Real>, Matrix3<Real>), CalibrationError> {
    let p_label = format!("P_rect_{camera}:");
    let rows = read_rows(path, &[(p_label.as_str(), 12), (R_RECT_LABEL, 9)])?;

    let p_rect = Matrix3x4::from_row_slice(&rows[&p_label]);
    let r_rect = Matrix3::from_row_slice(&rows[R_RECT_LABEL]);
    Ok((p_rect, r_rect))
}

/// Rotation `R` and translation `T` from the LIDAR frame to camera 0.
pub fn read_velo_to_cam(path: &Path) -> Result<(Matrix3<Real>, Vector3<Real>), CalibrationError> {
    let rows = read_rows(
        path,
        &[(VELO_ROTATION_LABEL, 9), (VELO_TRANSLATION_LABEL, 3)],
    )?;

    let rotation = Matrix3::from_row_slice(&rows[VELO_ROTATION_LABEL]);
    let translation = Vector3::from_row_slice(&rows[VELO_TRANSLATION_LABEL]);
    Ok((rotation, translation))
}

/// Loads the calibration stored in `calib_dir` for the given rectified camera.
pub fn load_calibration(calib_dir: &Path, camera: &str) -> Result<Calibration, CalibrationError> {
    let cam_to_cam = calib_dir.join(CAM_TO_CAM_FILE);
    let velo_to_cam = calib_dir.join(VELO_TO_CAM_FILE);
    for path in [&cam_to_cam, &velo_to_cam] {
        if !path.is_file() {
            return Err(CalibrationError::Missing(path.clone()));
        }
    }

    let (p_rect, r_rect) = read_cam_to_cam(&cam_to_cam, camera)?;
    let (rotation, translation) = read_velo_to_cam(&velo_to_cam)?;
    log::debug!("loaded calibration from {}", calib_dir.display());

    Ok(Calibration::new(p_rect, &r_rect, &rotation, &translation))
}
