use std::{collections::BTreeMap, fmt};

/// Why a single (tracklet, frame) sample produced no patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameSkip {
    ImageMissing,
    ImageDecodeFailure,
    DegenerateCrop,
    BehindCamera,
}

impl fmt::Display for FrameSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrameSkip::ImageMissing => "image missing",
            FrameSkip::ImageDecodeFailure => "image decode failure",
            FrameSkip::DegenerateCrop => "degenerate crop",
            FrameSkip::BehindCamera => "behind camera",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CropSummary {
    pub sequences_processed: usize,
    pub sequences_skipped: usize,
    /// Keyed by output category directory name.
    pub patches_written: BTreeMap<String, usize>,
    pub frames_skipped: BTreeMap<FrameSkip, usize>,
}

impl CropSummary {
    pub fn record_patch(&mut self, category: &str) {
        *self.patches_written.entry(category.to_owned()).or_default() += 1;
    }

    pub fn record_skip(&mut self, reason: FrameSkip) {
        *self.frames_skipped.entry(reason).or_default() += 1;
    }

    pub fn patches(&self, category: &str) -> usize {
        self.patches_written.get(category).copied().unwrap_or(0)
    }

    pub fn skipped(&self, reason: FrameSkip) -> usize {
        self.frames_skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn total_patches(&self) -> usize {
        self.patches_written.values().sum()
    }

    pub fn merge(mut self, other: CropSummary) -> CropSummary {
        self.sequences_processed += other.sequences_processed;
        self.sequences_skipped += other.sequences_skipped;
        for (category, n) in other.patches_written {
            *self.patches_written.entry(category).or_default() += n;
        }
        for (reason, n) in other.frames_skipped {
            *self.frames_skipped.entry(reason).or_default() += n;
        }
        self
    }
}

impl fmt::Display for CropSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sequences processed, {} skipped, {} patches",
            self.sequences_processed,
            self.sequences_skipped,
            self.total_patches()
        )?;
        for (category, n) in &self.patches_written {
            write!(f, ", {category}: {n}")?;
        }
        for (reason, n) in &self.frames_skipped {
            write!(f, ", {reason}: {n}")?;
        }
        Ok(())
    }
}
