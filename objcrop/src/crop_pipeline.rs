use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use image::{GenericImageView, ImageFormat};
use rayon::prelude::*;
use rcrop_core::{
    box_geometry::ObjectPose,
    crop_rect::{BoundingRect, CropRect},
    tracklet::{FramePose, Tracklet},
    Dataset, Projector,
};
use rcrop_dataset_reader::{
    kitti_reader::{frame_image_path, DEFAULT_CAMERA},
    KittiReader, KittiSequence,
};
use serde::Deserialize;

use crate::{
    patch_io::{read_frame, write_patch, PatchSize},
    summary::{CropSummary, FrameSkip},
};

/// What to do with box corners that project from behind the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Drop corners with non-positive depth before forming the rectangle.
    #[default]
    InFrontOnly,
    /// Keep every corner, whatever its depth.
    Permissive,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CropPipelineCfg {
    pub tracklets_dir: PathBuf,
    pub raw_data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub target_width: u32,
    pub target_height: u32,
    pub categories: Vec<String>,
    pub camera: String,
    pub output_extension: String,
    pub depth_policy: DepthPolicy,
    pub parallel: bool,
}

impl Default for CropPipelineCfg {
    fn default() -> Self {
        Self {
            tracklets_dir: PathBuf::from("tracklets"),
            raw_data_dir: PathBuf::from("raw_data"),
            output_dir: PathBuf::from("dataset"),
            target_width: 150,
            target_height: 150,
            categories: ["Car", "Pedestrian", "Cyclist", "Van"]
                .into_iter()
                .map(String::from)
                .collect(),
            camera: String::from(DEFAULT_CAMERA),
            output_extension: String::from("png"),
            depth_policy: DepthPolicy::default(),
            parallel: true,
        }
    }
}

impl CropPipelineCfg {
    pub fn finalize(self) -> Result<CropPipeline> {
        if self.target_width == 0 || self.target_height == 0 {
            bail!(
                "target size must be positive, got {}x{}",
                self.target_width,
                self.target_height
            );
        }
        match ImageFormat::from_extension(&self.output_extension) {
            Some(format) if format.writing_enabled() => {}
            _ => bail!("unsupported output extension {:?}", self.output_extension),
        }
        if self.categories.is_empty() {
            log::warn!("no categories configured, nothing will be written");
        }

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output directory {}", self.output_dir.display())
        })?;

        log::info!(
            "cropping {:?} from {} into {} at {}x{}",
            self.categories,
            self.tracklets_dir.display(),
            self.output_dir.display(),
            self.target_width,
            self.target_height
        );
        log::debug!("depth policy: {:?}, parallel: {}", self.depth_policy, self.parallel);

        Ok(CropPipeline {
            reader: KittiReader::new(self.tracklets_dir, self.raw_data_dir).with_camera(&self.camera),
            output_dir: self.output_dir,
            patch_size: PatchSize {
                width: self.target_width,
                height: self.target_height,
            },
            categories: self.categories,
            output_extension: self.output_extension,
            depth_policy: self.depth_policy,
            parallel: self.parallel,
        })
    }
}

pub struct CropPipeline {
    reader: KittiReader,
    output_dir: PathBuf,
    patch_size: PatchSize,
    categories: Vec<String>,
    output_extension: String,
    depth_policy: DepthPolicy,
    parallel: bool,
}

struct CropJob<'a> {
    tracklet_index: usize,
    category: &'a str,
    object: ObjectPose,
}

impl CropPipeline {
    /// Crops every sequence. Only output-side failures are returned as errors;
    /// unusable sequences and frames are logged and counted.
    pub fn run(&self) -> Result<CropSummary> {
        let sequences = self.reader.sequences().context("failed to list tracklet files")?;
        log::info!("found {} sequences", sequences.len());

        let summary = if self.parallel {
            sequences
                .par_iter()
                .map(|sequence| self.process_sequence(sequence))
                .try_reduce(CropSummary::default, |a, b| Ok(a.merge(b)))?
        } else {
            let mut summary = CropSummary::default();
            for sequence in &sequences {
                summary = summary.merge(self.process_sequence(sequence)?);
            }
            summary
        };

        log::info!("done: {summary}");
        Ok(summary)
    }

    pub fn process_sequence(&self, sequence: &KittiSequence) -> Result<CropSummary> {
        log::info!("processing sequence {}", sequence.id);
        let mut summary = CropSummary::default();

        let projector = match sequence.load_projector() {
            Ok(projector) => projector,
            Err(e) => {
                log::warn!("skipping sequence {}: {e}", sequence.id);
                summary.sequences_skipped += 1;
                return Ok(summary);
            }
        };
        let Some(image_dir) = sequence.image_dir() else {
            log::warn!(
                "skipping sequence {}: no image directory in {}",
                sequence.id,
                sequence.drive_dir.display()
            );
            summary.sequences_skipped += 1;
            return Ok(summary);
        };
        let tracklets = match sequence.load_tracklets() {
            Ok(tracklets) => tracklets,
            Err(e) => {
                log::warn!("skipping sequence {}: {e}", sequence.id);
                summary.sequences_skipped += 1;
                return Ok(summary);
            }
        };

        self.crop_sequence(&sequence.id, &projector, &image_dir, &tracklets, &mut summary)?;
        summary.sequences_processed += 1;
        Ok(summary)
    }

    /// Crops all allowed tracklets of one sequence. Each frame image is
    /// decoded at most once.
    pub fn crop_sequence<P: Projector>(
        &self,
        sequence_id: &str,
        projector: &P,
        image_dir: &Path,
        tracklets: &[Tracklet],
        summary: &mut CropSummary,
    ) -> Result<()> {
        let mut frames: BTreeMap<usize, Vec<CropJob<'_>>> = BTreeMap::new();
        for (tracklet_index, tracklet) in tracklets.iter().enumerate() {
            if !self.is_allowed(&tracklet.object_type) {
                log::debug!(
                    "sequence {sequence_id}: ignoring tracklet {tracklet_index} ({})",
                    tracklet.object_type
                );
                continue;
            }
            let category_dir = self.category_dir(&tracklet.object_type);
            fs::create_dir_all(&category_dir).with_context(|| {
                format!("failed to create category directory {}", category_dir.display())
            })?;

            for FramePose {
                frame_index,
                object,
            } in tracklet.iter()
            {
                frames.entry(frame_index).or_default().push(CropJob {
                    tracklet_index,
                    category: &tracklet.object_type,
                    object,
                });
            }
        }

        for (frame_index, jobs) in frames {
            let located: Vec<_> = jobs
                .iter()
                .map(|job| bounding_rect(projector, &job.object, self.depth_policy))
                .collect();
            if located.iter().all(Result::is_err) {
                located
                    .into_iter()
                    .filter_map(Result::err)
                    .for_each(|reason| summary.record_skip(reason));
                continue;
            }

            let image = match read_frame(&frame_image_path(image_dir, frame_index)) {
                Ok(image) => image,
                Err(reason) => {
                    log::debug!("sequence {sequence_id}: frame {frame_index}: {reason}");
                    for rect in located {
                        summary.record_skip(rect.err().unwrap_or(reason));
                    }
                    continue;
                }
            };
            let (width, height) = image.dimensions();

            for (job, rect) in jobs.iter().zip(located) {
                let crop = rect.and_then(|r| r.clamp(width, height).ok_or(FrameSkip::DegenerateCrop));
                let rect = match crop {
                    Ok(rect) => rect,
                    Err(reason) => {
                        log::debug!(
                            "sequence {sequence_id}: tracklet {} frame {frame_index}: {reason}",
                            job.tracklet_index
                        );
                        summary.record_skip(reason);
                        continue;
                    }
                };
                let path = self.patch_path(sequence_id, job.category, job.tracklet_index, frame_index);
                write_patch(&image, &rect, self.patch_size, &path)?;
                summary.record_patch(&job.category.to_lowercase());
            }
        }
        Ok(())
    }

    pub fn is_allowed(&self, object_type: &str) -> bool {
        self.categories.iter().any(|c| c == object_type)
    }

    pub fn category_dir(&self, object_type: &str) -> PathBuf {
        self.output_dir.join(object_type.to_lowercase())
    }

    /// `<output>/<category>/<sequence>_<tracklet:03>_<frame:06>.<ext>`
    pub fn patch_path(
        &self,
        sequence_id: &str,
        object_type: &str,
        tracklet_index: usize,
        frame_index: usize,
    ) -> PathBuf {
        self.category_dir(object_type).join(format!(
            "{sequence_id}_{tracklet_index:03}_{frame_index:06}.{}",
            self.output_extension
        ))
    }
}

/// Unclipped image rectangle around the projected corners of `object`.
pub fn bounding_rect<P: Projector>(
    projector: &P,
    object: &ObjectPose,
    policy: DepthPolicy,
) -> Result<BoundingRect, FrameSkip> {
    let projected = projector.project_with_depth(&object.corners());
    let pixels: Vec<_> = projected
        .iter()
        .filter(|p| policy == DepthPolicy::Permissive || p.is_in_front())
        .map(|p| p.pixel)
        .collect();
    if pixels.is_empty() {
        return Err(FrameSkip::BehindCamera);
    }
    BoundingRect::from_pixels(&pixels).ok_or(FrameSkip::DegenerateCrop)
}

/// Crop rectangle of `object` inside a `width` x `height` image.
pub fn locate_crop<P: Projector>(
    projector: &P,
    object: &ObjectPose,
    policy: DepthPolicy,
    width: u32,
    height: u32,
) -> Result<CropRect, FrameSkip> {
    bounding_rect(projector, object, policy)?
        .clamp(width, height)
        .ok_or(FrameSkip::DegenerateCrop)
}
