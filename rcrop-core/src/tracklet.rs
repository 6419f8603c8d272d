use crate::{
    box_geometry::{BoxDimensions, ObjectPose, Pose},
    Dataset,
};

/// A pose paired with the frame it was annotated in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePose {
    pub frame_index: usize,
    pub object: ObjectPose,
}

/// One tracked object over a contiguous range of frames.
///
/// `poses[i]` belongs to frame `first_frame + i`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tracklet {
    pub object_type: String,
    pub dimensions: BoxDimensions,
    pub first_frame: usize,
    pub poses: Vec<Pose>,
}

impl Tracklet {
    pub fn last_frame(&self) -> Option<usize> {
        self.poses.len().checked_sub(1).map(|n| self.first_frame + n)
    }
}

impl Dataset<FramePose> for Tracklet {
    fn get(&self, index: usize) -> Option<FramePose> {
        let pose = *self.poses.get(index)?;
        Some(FramePose {
            frame_index: self.first_frame + index,
            object: ObjectPose {
                dimensions: self.dimensions,
                pose,
            },
        })
    }

    fn len(&self) -> usize {
        self.poses.len()
    }
}
