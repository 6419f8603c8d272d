use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use rcrop_core::crop_rect::CropRect;

use crate::summary::FrameSkip;

/// Output patch resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchSize {
    pub width: u32,
    pub height: u32,
}

pub fn read_frame(path: &Path) -> Result<DynamicImage, FrameSkip> {
    if !path.is_file() {
        return Err(FrameSkip::ImageMissing);
    }
    image::open(path).map_err(|e| {
        log::debug!("cannot decode {}: {e}", path.display());
        FrameSkip::ImageDecodeFailure
    })
}

/// Crops `rect` out of `image`, resizes it bilinearly and writes it to `path`.
/// The output format follows the file extension.
pub fn write_patch(image: &DynamicImage, rect: &CropRect, size: PatchSize, path: &Path) -> Result<()> {
    image
        .crop_imm(rect.x, rect.y, rect.width, rect.height)
        .resize_exact(size.width, size.height, FilterType::Triangle)
        .save(path)
        .with_context(|| format!("failed to write patch {}", path.display()))
}
