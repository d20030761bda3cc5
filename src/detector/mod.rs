pub mod ordering;
pub mod subpix;

use chess_corners::{ChessConfig, CornerDescriptor, find_chess_corners_image};
use glam::Vec2;
use image::GrayImage;
use log::debug;

use crate::error::{CalibError, Result};
pub use subpix::{SubPixParams, refine_corners};

/// Preprocessing switches of the chessboard search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorFlags {
    /// Threshold the response relative to its strongest peak instead of a fixed level.
    pub adaptive_threshold: bool,
    /// Stretch the gray levels to the full range before searching.
    pub normalize_image: bool,
}

impl Default for DetectorFlags {
    fn default() -> Self {
        Self {
            adaptive_threshold: true,
            normalize_image: true,
        }
    }
}

pub trait CornerDetector {
    /// Ordered interior corners of a `cols x rows` board, or `None` if it is not fully visible.
    fn detect(&self, gray: &GrayImage, pattern_size: (usize, usize), flags: DetectorFlags) -> Option<Vec<Vec2>>;
}

/// ChESS corners from `chess-corners`, put into board order by [`ordering::order_corners`].
#[derive(Debug, Clone)]
pub struct ChessboardDetector {
    pub nms_radius: u32,
    /// Fraction of the strongest response, used with `adaptive_threshold`.
    pub relative_threshold: f32,
    /// Fixed response level, used without `adaptive_threshold`.
    pub absolute_threshold: f32,
}

impl Default for ChessboardDetector {
    fn default() -> Self {
        Self {
            nms_radius: 2,
            relative_threshold: 0.2,
            absolute_threshold: 100.0,
        }
    }
}

impl ChessboardDetector {
    fn chess_config(&self, flags: DetectorFlags) -> ChessConfig {
        let mut cfg = ChessConfig::single_scale();
        cfg.params.nms_radius = self.nms_radius;
        cfg.params.threshold_rel = self.relative_threshold;
        cfg.params.threshold_abs = (!flags.adaptive_threshold).then_some(self.absolute_threshold);
        cfg
    }
}

fn normalize(gray: &GrayImage) -> GrayImage {
    let (lo, hi) = gray
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if hi <= lo {
        return gray.clone();
    }
    let scale = 255.0 / (hi - lo) as f32;
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p.0[0] = ((p.0[0] - lo) as f32 * scale).round() as u8;
    }
    out
}

impl CornerDetector for ChessboardDetector {
    fn detect(&self, gray: &GrayImage, pattern_size: (usize, usize), flags: DetectorFlags) -> Option<Vec<Vec2>> {
        let (cols, rows) = pattern_size;
        if cols < 2 || rows < 2 {
            return None;
        }
        let mut corners: Vec<CornerDescriptor> = if flags.normalize_image {
            find_chess_corners_image(&normalize(gray), &self.chess_config(flags))
        } else {
            find_chess_corners_image(gray, &self.chess_config(flags))
        };
        debug!("{} ChESS corners", corners.len());
        corners.sort_by(|a, b| b.response.total_cmp(&a.response));
        let points: Vec<Vec2> = corners.iter().map(|c| Vec2::new(c.x, c.y)).collect();
        ordering::order_corners(&points, cols, rows)
    }
}

/// Single-call corner API: detect with default flags, then refine to sub-pixel.
///
/// Corners come back as `[x, y]` in row-major board order; an image without a complete
/// `cols x rows` board gives an empty vector.
pub fn get_corners(gray: &GrayImage, cols: usize, rows: usize) -> Result<Vec<[f32; 2]>> {
    if gray.width() == 0 || gray.height() == 0 {
        return Err(CalibError::EmptyImage);
    }
    let detector = ChessboardDetector::default();
    let Some(corners) = detector.detect(gray, (cols, rows), DetectorFlags::default()) else {
        return Ok(Vec::new());
    };
    let refined = refine_corners(gray, &corners, &SubPixParams::default());
    Ok(refined.iter().map(|p| [p.x, p.y]).collect())
}
