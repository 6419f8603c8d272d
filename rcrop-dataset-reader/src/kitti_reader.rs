use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rcrop_core::tracklet::Tracklet;
use rcrop_sensor::CalibrationProjector;

use crate::{
    calib::{load_calibration, CalibrationError},
    tracklets::{read_tracklets, TrackletError},
};

pub const CALIB_DIR: &str = "calib";
pub const DEFAULT_CAMERA: &str = "02";
// grayscale left camera, used when the color images were not extracted
pub const FALLBACK_IMAGE_DIR: &str = "image_00";

/// KITTI raw layout: one tracklet label file per drive in `tracklets_dir`,
/// and `raw_data_dir/drive_<id>/{calib,image_0X/data}` per drive.
#[derive(Clone, Debug)]
pub struct KittiReader {
    tracklets_dir: PathBuf,
    raw_data_dir: PathBuf,
    camera: String,
}

impl KittiReader {
    pub fn new(tracklets_dir: impl Into<PathBuf>, raw_data_dir: impl Into<PathBuf>) -> Self {
        KittiReader {
            tracklets_dir: tracklets_dir.into(),
            raw_data_dir: raw_data_dir.into(),
            camera: DEFAULT_CAMERA.to_owned(),
        }
    }

    /// Rectified camera whose projection and images are used, e.g. `"02"`.
    pub fn with_camera(mut self, camera: &str) -> Self {
        self.camera = camera.to_owned();
        self
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    /// All `*.xml` files of the tracklet directory, ordered by path.
    pub fn sequences(&self) -> io::Result<Vec<KittiSequence>> {
        let mut files = vec![];
        for entry in fs::read_dir(&self.tracklets_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "xml") {
                files.push(path);
            }
        }
        files.sort();

        Ok(files
            .into_iter()
            .filter_map(|tracklet_file| {
                let Some(id) = sequence_id(&tracklet_file) else {
                    log::warn!("cannot derive sequence id from {}", tracklet_file.display());
                    return None;
                };
                Some(KittiSequence {
                    drive_dir: self.raw_data_dir.join(format!("drive_{id}")),
                    id,
                    tracklet_file,
                    camera: self.camera.clone(),
                })
            })
            .collect())
    }
}

/// Last `_`-separated component of the file stem:
/// `tracklet_labels_0001.xml` is sequence `0001`.
pub fn sequence_id(tracklet_file: &Path) -> Option<String> {
    let stem = tracklet_file.file_stem()?.to_str()?;
    let id = stem.rsplit('_').next()?;
    (!id.is_empty()).then(|| id.to_owned())
}

/// `<image_dir>/<frame:010>.png`
pub fn frame_image_path(image_dir: &Path, frame_index: usize) -> PathBuf {
    image_dir.join(format!("{frame_index:010}.png"))
}

#[derive(Clone, Debug)]
pub struct KittiSequence {
    pub id: String,
    pub tracklet_file: PathBuf,
    pub drive_dir: PathBuf,
    camera: String,
}

impl KittiSequence {
    pub fn new(id: &str, tracklet_file: impl Into<PathBuf>, drive_dir: impl Into<PathBuf>) -> Self {
        KittiSequence {
            id: id.to_owned(),
            tracklet_file: tracklet_file.into(),
            drive_dir: drive_dir.into(),
            camera: DEFAULT_CAMERA.to_owned(),
        }
    }

    pub fn calib_dir(&self) -> PathBuf {
        self.drive_dir.join(CALIB_DIR)
    }

    pub fn load_projector(&self) -> Result<CalibrationProjector, CalibrationError> {
        let calibration = load_calibration(&self.calib_dir(), &self.camera)?;
        Ok(CalibrationProjector::new(calibration))
    }

    /// Frame directory of the configured camera, else of the fallback camera.
    pub fn image_dir(&self) -> Option<PathBuf> {
        [format!("image_{}", self.camera), FALLBACK_IMAGE_DIR.to_owned()]
            .into_iter()
            .map(|camera_dir| self.drive_dir.join(camera_dir).join("data"))
            .find(|dir| dir.is_dir())
    }

    pub fn load_tracklets(&self) -> Result<Vec<Tracklet>, TrackletError> {
        read_tracklets(&self.tracklet_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calib::tests::{write_calib, CAM_TO_CAM, VELO_TO_CAM},
        tracklets::tests::TRACKLETS,
    };

    #[test]
    fn sequence_id_is_last_stem_component() {
        assert_eq!(
            sequence_id(Path::new("tracklets/tracklet_labels_0001.xml")).as_deref(),
            Some("0001")
        );
        assert_eq!(sequence_id(Path::new("0042.xml")).as_deref(), Some("0042"));
        assert_eq!(sequence_id(Path::new("labels_.xml")), None);
    }

    #[test]
    fn frame_paths_are_zero_padded() {
        assert_eq!(
            frame_image_path(Path::new("d/image_02/data"), 17),
            PathBuf::from("d/image_02/data/0000000017.png")
        );
    }

    #[test]
    fn lists_xml_files_in_order() {
        let root = tempfile::tempdir().unwrap();
        let tracklets = root.path().join("tracklets");
        fs::create_dir_all(&tracklets).unwrap();
        fs::write(tracklets.join("tracklet_labels_0005.xml"), TRACKLETS).unwrap();
        fs::write(tracklets.join("tracklet_labels_0001.xml"), TRACKLETS).unwrap();
        fs::write(tracklets.join("notes.txt"), "ignored").unwrap();

        let reader = KittiReader::new(&tracklets, root.path().join("raw_data"));
        let sequences = reader.sequences().unwrap();
        let ids: Vec<_> = sequences.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["0001", "0005"]);
        assert_eq!(
            sequences[0].drive_dir,
            root.path().join("raw_data").join("drive_0001")
        );
        assert_eq!(sequences[1].load_tracklets().unwrap().len(), 2);
    }

    #[test]
    fn missing_tracklet_dir_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let reader = KittiReader::new(root.path().join("nope"), root.path());
        assert!(reader.sequences().is_err());
    }

    #[test]
    fn image_dir_prefers_color_camera() {
        let root = tempfile::tempdir().unwrap();
        let sequence = KittiSequence::new("0001", "unused.xml", root.path());
        assert_eq!(sequence.image_dir(), None);

        let gray = root.path().join("image_00").join("data");
        fs::create_dir_all(&gray).unwrap();
        assert_eq!(sequence.image_dir(), Some(gray));

        let color = root.path().join("image_02").join("data");
        fs::create_dir_all(&color).unwrap();
        assert_eq!(sequence.image_dir(), Some(color));
    }

    #[test]
    fn projector_is_loaded_from_calib_dir() {
        let root = tempfile::tempdir().unwrap();
        let sequence = KittiSequence::new("0001", "unused.xml", root.path());
        assert!(matches!(
            sequence.load_projector(),
            Err(CalibrationError::Missing(_))
        ));

        write_calib(&sequence.calib_dir(), CAM_TO_CAM, VELO_TO_CAM);
        let projector = sequence.load_projector().unwrap();
        assert_eq!(projector.calibration().r_rect[(3, 3)], 1.0);
    }
}
