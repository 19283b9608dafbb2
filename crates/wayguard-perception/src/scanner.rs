//! Strided depth-buffer scanner.
//!
//! [`RegionScanner::scan`] walks a sub-grid of the region of interest with a
//! fixed stride in both axes and aggregates the per-pixel distances into a
//! [`ScanStatistics`] value:
//!
//! - **close** pixels: `0 < d < obstacle_limit_mm`
//! - **deep** pixels: `d > drop_off_limit_mm`, optionally only on rows at or
//!   below the region's lower-band start
//! - **upper / lower averages**: mean distance above and below the region's
//!   vertical midpoint, used for the staircase signature
//!
//! `total_scanned_pixels` counts the grid points visited, not the raw region
//! area, so the stride does not bias the fractions the classifier derives.
//!
//! The frame is taken by value and released before `scan` returns, on every
//! path including a panic inside the frame implementation.
//!
//! # Example
//!
//! ```rust
//! use wayguard_perception::roi::RegionOfInterest;
//! use wayguard_perception::scanner::RegionScanner;
//! use wayguard_types::DepthFrame;
//!
//! let frame = DepthFrame::from_millimetres(4, 4, &[800; 16]);
//! let roi = RegionOfInterest::new(0.0, 1.0, 0.0, 1.0).unwrap();
//! let stats = RegionScanner::new(1200, 4000).scan(frame, &roi, 2);
//! assert_eq!(stats.total_scanned_pixels, 4);
//! assert_eq!(stats.close_pixel_count, 4);
//! ```

use tracing::warn;
use wayguard_types::DepthImage;

use crate::roi::RegionOfInterest;

// ────────────────────────────────────────────────────────────────────────────
// ScanStatistics
// ────────────────────────────────────────────────────────────────────────────

/// Aggregate statistics for one frame, region and stride.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScanStatistics {
    /// Valid samples nearer than the obstacle limit.
    pub close_pixel_count: u32,
    /// Valid samples farther than the drop-off limit.
    pub deep_pixel_count: u32,
    /// Grid points visited, including invalid (zero) samples.
    pub total_scanned_pixels: u32,
    /// Mean distance of valid samples in the upper half (millimetres).
    pub upper_average_depth_mm: f32,
    /// Mean distance of valid samples in the lower half (millimetres).
    pub lower_average_depth_mm: f32,
    pub upper_sample_count: u32,
    pub lower_sample_count: u32,
}

impl ScanStatistics {
    /// Fraction of visited points that were close, `0.0` when nothing was
    /// visited.
    pub fn close_fraction(&self) -> f64 {
        fraction(self.close_pixel_count, self.total_scanned_pixels)
    }

    /// Fraction of visited points that were deep, `0.0` when nothing was
    /// visited.
    pub fn deep_fraction(&self) -> f64 {
        fraction(self.deep_pixel_count, self.total_scanned_pixels)
    }
}

fn fraction(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RegionScanner
// ────────────────────────────────────────────────────────────────────────────

/// Scans depth frames against fixed obstacle and drop-off distance limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionScanner {
    obstacle_limit_mm: u16,
    drop_off_limit_mm: u16,
}

impl RegionScanner {
    pub fn new(obstacle_limit_mm: u16, drop_off_limit_mm: u16) -> Self {
        Self {
            obstacle_limit_mm,
            drop_off_limit_mm,
        }
    }

    /// Scan `frame` inside `roi`, sampling every `step` pixels in both axes.
    ///
    /// A `step` of `0` is treated as `1`.  An invalid or zero-area region
    /// yields all-zero statistics.  `frame` is dropped before returning.
    pub fn scan<F: DepthImage>(&self, frame: F, roi: &RegionOfInterest, step: u32) -> ScanStatistics {
        let stats = self.scan_borrowed(&frame, roi, step);
        drop(frame);
        stats
    }

    fn scan_borrowed<F: DepthImage>(
        &self,
        frame: &F,
        roi: &RegionOfInterest,
        step: u32,
    ) -> ScanStatistics {
        if let Err(e) = roi.validate() {
            warn!(error = %e, "skipping scan: invalid region of interest");
            return ScanStatistics::default();
        }

        let bounds = roi.pixel_bounds(frame.width(), frame.height());
        if bounds.is_degenerate() {
            warn!(
                width = frame.width(),
                height = frame.height(),
                ?bounds,
                "skipping scan: region of interest has zero area"
            );
            return ScanStatistics::default();
        }

        let step = step.max(1) as usize;
        let mid_y = bounds.mid_y();

        let mut stats = ScanStatistics::default();
        let mut upper_sum: u64 = 0;
        let mut lower_sum: u64 = 0;

        for y in (bounds.start_y..bounds.end_y).step_by(step) {
            let in_lower_band = y >= bounds.lower_band_y;
            for x in (bounds.start_x..bounds.end_x).step_by(step) {
                stats.total_scanned_pixels += 1;

                let distance = match frame.sample(x, y) {
                    Some(s) if s.is_valid() => s.distance_mm,
                    _ => continue,
                };

                if distance < self.obstacle_limit_mm {
                    stats.close_pixel_count += 1;
                }
                if distance > self.drop_off_limit_mm && in_lower_band {
                    stats.deep_pixel_count += 1;
                }

                if y < mid_y {
                    upper_sum += u64::from(distance);
                    stats.upper_sample_count += 1;
                } else {
                    lower_sum += u64::from(distance);
                    stats.lower_sample_count += 1;
                }
            }
        }

        stats.upper_average_depth_mm = average(upper_sum, stats.upper_sample_count);
        stats.lower_average_depth_mm = average(lower_sum, stats.lower_sample_count);
        stats
    }
}

fn average(sum: u64, count: u32) -> f32 {
    if count == 0 {
        0.0
    } else {
        (sum as f64 / f64::from(count)) as f32
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
