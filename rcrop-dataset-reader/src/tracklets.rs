use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rcrop_core::{
    box_geometry::{BoxDimensions, Pose},
    tracklet::Tracklet,
    Real,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackletError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse tracklets in {}: {source}", .path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },
}

// Boost serialization layout of tracklet_labels.xml. Fields not listed
// (count, item_version, occlusion, ...) are ignored.
#[derive(Debug, Deserialize)]
struct TrackletLabels {
    tracklets: TrackletList,
}

#[derive(Debug, Deserialize)]
struct TrackletList {
    #[serde(rename = "item", default)]
    items: Vec<TrackletItem>,
}

#[derive(Debug, Deserialize)]
struct TrackletItem {
    #[serde(rename = "objectType")]
    object_type: String,
    h: Real,
    w: Real,
    l: Real,
    first_frame: usize,
    #[serde(default)]
    poses: PoseList,
}

#[derive(Debug, Default, Deserialize)]
struct PoseList {
    #[serde(rename = "item", default)]
    items: Vec<Pose>,
}

impl From<TrackletItem> for Tracklet {
    fn from(item: TrackletItem) -> Self {
        Tracklet {
            object_type: item.object_type.trim().to_owned(),
            dimensions: BoxDimensions::new(item.h, item.w, item.l),
            first_frame: item.first_frame,
            poses: item.poses.items,
        }
    }
}

/// Parses a tracklet label document. Tracklets keep their document order.
pub fn parse_tracklets(xml: &str) -> Result<Vec<Tracklet>, quick_xml::DeError> {
    let labels: TrackletLabels = quick_xml::de::from_str(xml)?;
    Ok(labels
        .tracklets
        .items
        .into_iter()
        .map(Tracklet::from)
        .collect())
}

pub fn read_tracklets(path: &Path) -> Result<Vec<Tracklet>, TrackletError> {
    let xml = fs::read_to_string(path).map_err(|source| TrackletError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_tracklets(&xml).map_err(|source| TrackletError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rcrop_core::Dataset;

    pub(crate) const TRACKLETS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
<!DOCTYPE boost_serialization>
<boost_serialization signature="serialization::archive" version="9">
<tracklets class_id="0" tracking_level="0" version="0">
	<count>2</count>
	<item_version>1</item_version>
	<item class_id="1" tracking_level="0" version="1">
		<objectType>Car</objectType>
		<h>1.5</h>
		<w>1.6</w>
		<l>4.0</l>
		<first_frame>3</first_frame>
		<poses class_id="2" tracking_level="0" version="0">
			<count>2</count>
			<item_version>2</item_version>
			<item class_id="3" tracking_level="0" version="2">
				<tx>10.0</tx>
				<ty>-1.0</ty>
				<tz>-1.7</tz>
				<rx>0.0</rx>
				<ry>0.0</ry>
				<rz>0.1</rz>
				<state>1</state>
				<occlusion>0</occlusion>
				<occlusion_kf>0</occlusion_kf>
				<truncation>0</truncation>
				<amt_occlusion>0.0</amt_occlusion>
				<amt_occlusion_kf>-1</amt_occlusion_kf>
				<amt_border_l>0.0</amt_border_l>
				<amt_border_r>0.0</amt_border_r>
				<amt_border_kf>-1</amt_border_kf>
			</item>
			<item>
				<tx>10.5</tx>
				<ty>-1.0</ty>
				<tz>-1.7</tz>
				<rx>0.0</rx>
				<ry>0.0</ry>
				<rz>0.12</rz>
				<state>1</state>
				<occlusion>0</occlusion>
				<occlusion_kf>0</occlusion_kf>
				<truncation>0</truncation>
				<amt_occlusion>0.0</amt_occlusion>
				<amt_occlusion_kf>-1</amt_occlusion_kf>
				<amt_border_l>0.0</amt_border_l>
				<amt_border_r>0.0</amt_border_r>
				<amt_border_kf>-1</amt_border_kf>
			</item>
		</poses>
		<finished>1</finished>
	</item>
	<item>
		<objectType>Truck</objectType>
		<h>3.2</h>
		<w>2.5</w>
		<l>9.0</l>
		<first_frame>0</first_frame>
		<poses class_id="2" tracking_level="0" version="0">
			<count>1</count>
			<item_version>2</item_version>
			<item>
				<tx>20.0</tx>
				<ty>4.0</ty>
				<tz>-1.5</tz>
				<rx>0.0</rx>
				<ry>0.0</ry>
				<rz>-1.2</rz>
				<state>1</state>
				<occlusion>0</occlusion>
				<occlusion_kf>0</occlusion_kf>
				<truncation>0</truncation>
				<amt_occlusion>0.0</amt_occlusion>
				<amt_occlusion_kf>-1</amt_occlusion_kf>
				<amt_border_l>0.0</amt_border_l>
				<amt_border_r>0.0</amt_border_r>
				<amt_border_kf>-1</amt_border_kf>
			</item>
		</poses>
		<finished>1</finished>
	</item>
</tracklets>
</boost_serialization>
"#;

    #[test]
    fn parses_boost_tracklet_document() {
        let tracklets = parse_tracklets(TRACKLETS).unwrap();
        assert_eq!(tracklets.len(), 2);

        let car = &tracklets[0];
        assert_eq!(car.object_type, "Car");
        assert_eq!(car.dimensions, BoxDimensions::new(1.5, 1.6, 4.0));
        assert_eq!(car.first_frame, 3);
        assert_eq!(car.poses.len(), 2);
        assert_eq!(
            car.poses[1],
            Pose {
                tx: 10.5,
                ty: -1.0,
                tz: -1.7,
                rz: 0.12
            }
        );
        let frames: Vec<_> = car.iter().map(|f| f.frame_index).collect();
        assert_eq!(frames, vec![3, 4]);

        assert_eq!(tracklets[1].object_type, "Truck");
        assert_eq!(tracklets[1].poses[0].rz, -1.2);
    }

    #[test]
    fn document_without_items_has_no_tracklets() {
        let xml = r#"<boost_serialization><tracklets><count>0</count><item_version>1</item_version></tracklets></boost_serialization>"#;
        assert!(parse_tracklets(xml).unwrap().is_empty());
    }

    #[test]
    fn missing_dimension_is_an_error() {
        let xml = TRACKLETS.replace("<h>1.5</h>", "");
        assert!(parse_tracklets(&xml).is_err());
    }

    #[test]
    fn read_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tracklets(&dir.path().join("tracklet_labels_0001.xml")).unwrap_err();
        assert!(matches!(err, TrackletError::Io { .. }));
    }
}
