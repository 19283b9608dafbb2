//! Region of interest: the fractional sub-rectangle of a frame that is scanned.
//!
//! Bounds are fractions of the frame dimensions so the same region scales to
//! any sensor resolution.  [`RegionOfInterest::pixel_bounds`] converts them to
//! integer pixel bounds by truncation, so the scan grid is stable for a given
//! resolution.
//!
//! # Example
//!
//! ```rust
//! use wayguard_perception::roi::RegionOfInterest;
//!
//! let roi = RegionOfInterest::new(0.15, 0.85, 0.20, 0.75).unwrap();
//! let b = roi.pixel_bounds(1200, 1000);
//! assert_eq!((b.start_x, b.end_x), (180, 1020));
//! assert_eq!((b.start_y, b.end_y), (200, 750));
//! ```

use serde::{Deserialize, Serialize};
use wayguard_types::WayError;

/// Fractional scan bounds, all in `[0, 1]` relative to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    /// Frame-relative row fraction at which drop-off counting starts.  `None`
    /// counts deep pixels over the whole region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_band_start: Option<f32>,
}

/// Integer pixel bounds derived from a [`RegionOfInterest`].  `end_*` values
/// are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub start_x: u32,
    pub end_x: u32,
    pub start_y: u32,
    pub end_y: u32,
    /// First row eligible for drop-off counting.
    pub lower_band_y: u32,
}

impl PixelBounds {
    /// `true` when the bounds enclose no pixel at all.
    pub fn is_degenerate(&self) -> bool {
        self.start_x >= self.end_x || self.start_y >= self.end_y
    }

    /// Row at which the region is split into upper and lower halves.
    pub fn mid_y(&self) -> u32 {
        self.start_y + (self.end_y.saturating_sub(self.start_y)) / 2
    }
}

impl Default for RegionOfInterest {
    fn default() -> Self {
        Self {
            left: 0.15,
            right: 0.85,
            top: 0.20,
            bottom: 0.75,
            lower_band_start: None,
        }
    }
}

impl RegionOfInterest {
    /// Build a region, checking `left < right`, `top < bottom` and that every
    /// bound lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::InvalidGeometry`] when an invariant is violated.
    pub fn new(left: f32, right: f32, top: f32, bottom: f32) -> Result<Self, WayError> {
        let roi = Self {
            left,
            right,
            top,
            bottom,
            lower_band_start: None,
        };
        roi.validate()?;
        Ok(roi)
    }

    /// Restrict drop-off counting to rows at or below `start` (a fraction of
    /// the frame height).
    pub fn with_lower_band(mut self, start: f32) -> Result<Self, WayError> {
        self.lower_band_start = Some(start);
        self.validate()?;
        Ok(self)
    }

    /// Check the region invariants.  Deserialised regions bypass
    /// [`RegionOfInterest::new`], so consumers call this before scanning.
    pub fn validate(&self) -> Result<(), WayError> {
        let bounds = [
            ("left", self.left),
            ("right", self.right),
            ("top", self.top),
            ("bottom", self.bottom),
        ];
        for (name, value) in bounds {
            if !(0.0..=1.0).contains(&value) {
                return Err(WayError::InvalidGeometry(format!(
                    "roi {name} = {value} is outside [0, 1]"
                )));
            }
        }
        if self.left >= self.right {
            return Err(WayError::InvalidGeometry(format!(
                "roi left {} must be < right {}",
                self.left, self.right
            )));
        }
        if self.top >= self.bottom {
            return Err(WayError::InvalidGeometry(format!(
                "roi top {} must be < bottom {}",
                self.top, self.bottom
            )));
        }
        if let Some(start) = self.lower_band_start
            && !(0.0..=1.0).contains(&start)
        {
            return Err(WayError::InvalidGeometry(format!(
                "roi lower_band_start = {start} is outside [0, 1]"
            )));
        }
        Ok(())
    }

    /// Convert to integer pixel bounds for a `width × height` frame.
    ///
    /// Both start and end are truncated toward zero.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> PixelBounds {
        let start_y = scale(self.top, height);
        PixelBounds {
            start_x: scale(self.left, width),
            end_x: scale(self.right, width),
            start_y,
            end_y: scale(self.bottom, height),
            lower_band_y: self
                .lower_band_start
                .map(|f| scale(f, height))
                .unwrap_or(start_y),
        }
    }
}

/// Single-precision product, truncated toward zero.
fn scale(fraction: f32, extent: u32) -> u32 {
    let extent = extent as f32;
    (extent * fraction).floor().clamp(0.0, extent) as u32
}
