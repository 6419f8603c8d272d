use crate::{ImageCoordinates, Real};

/// Tightest axis-aligned rectangle around a set of pixels, unclipped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingRect {
    pub xmin: Real,
    pub ymin: Real,
    pub xmax: Real,
    pub ymax: Real,
}

/// Integer pixel rectangle lying inside an image, with non-zero area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRect {
    /// Returns `None` for an empty input or when any coordinate is not finite.
    pub fn from_pixels<'a, I>(pixels: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a ImageCoordinates>,
    {
        let mut pixels = pixels.into_iter();
        let first = pixels.next().filter(|p| is_finite(p))?;
        let init = BoundingRect {
            xmin: first.x,
            ymin: first.y,
            xmax: first.x,
            ymax: first.y,
        };
        pixels.try_fold(init, |r, p| {
            is_finite(p).then(|| BoundingRect {
                xmin: r.xmin.min(p.x),
                ymin: r.ymin.min(p.y),
                xmax: r.xmax.max(p.x),
                ymax: r.ymax.max(p.y),
            })
        })
    }

    pub fn width(&self) -> Real {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> Real {
        self.ymax - self.ymin
    }

    /// Clamps to `[0, width] x [0, height]` and truncates to whole pixels.
    ///
    /// `None` when the clamped rectangle has no area.
    pub fn clamp(&self, width: u32, height: u32) -> Option<CropRect> {
        let (x0, x1) = clamp_span(self.xmin, self.xmax, width)?;
        let (y0, y1) = clamp_span(self.ymin, self.ymax, height)?;
        Some(CropRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

fn is_finite(p: &ImageCoordinates) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

fn clamp_span(min: Real, max: Real, limit: u32) -> Option<(u32, u32)> {
    let lo = min.max(0.0) as i64;
    let hi = max.min(limit as Real) as i64;
    if hi <= lo {
        return None;
    }
    Some((lo as u32, hi as u32))
}

impl CropRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}
