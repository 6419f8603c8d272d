pub mod calib;
pub mod kitti_reader;
pub mod tracklets;

pub use calib::{load_calibration, CalibrationError};
pub use kitti_reader::{KittiReader, KittiSequence};
pub use tracklets::{read_tracklets, TrackletError};
