use glam;
use serde::{Deserialize, Serialize};

use crate::error::{CalibError, Result};

/// Checkerboard description as written in a board config JSON.
///
/// `rows` and `cols` count interior corners, `square_size_mm` is the edge of one square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
    pub square_size_mm: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 5,
            square_size_mm: 150.0,
        }
    }
}

/// Validated board geometry shared by detection, solving and preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardSpec {
    pub interior_corners_x: usize,
    pub interior_corners_y: usize,
    pub square_size_m: f64,
}

impl BoardSpec {
    pub fn new(interior_corners_x: usize, interior_corners_y: usize, square_size_m: f64) -> Result<BoardSpec> {
        if interior_corners_x == 0 || interior_corners_y == 0 {
            return Err(CalibError::InvalidBoard {
                rows: interior_corners_y,
                cols: interior_corners_x,
            });
        }
        if square_size_m <= 0.0 || !square_size_m.is_finite() {
            return Err(CalibError::InvalidSquareSize(square_size_m * 1000.0));
        }
        Ok(BoardSpec {
            interior_corners_x,
            interior_corners_y,
            square_size_m,
        })
    }

    /// Board from the command line convention: `rows` then `cols`, square size in millimetres.
    pub fn from_rows_cols(rows: usize, cols: usize, square_size_mm: f64) -> Result<BoardSpec> {
        BoardSpec::new(cols, rows, square_size_mm / 1000.0)
    }

    pub fn from_config(board_config: &BoardConfig) -> Result<BoardSpec> {
        Self::from_rows_cols(
            board_config.rows,
            board_config.cols,
            board_config.square_size_mm,
        )
    }

    pub fn cols(&self) -> usize {
        self.interior_corners_x
    }

    pub fn rows(&self) -> usize {
        self.interior_corners_y
    }

    /// Detector pattern size, `(cols, rows)`.
    pub fn pattern_size(&self) -> (usize, usize) {
        (self.interior_corners_x, self.interior_corners_y)
    }

    pub fn corner_count(&self) -> usize {
        self.interior_corners_x * self.interior_corners_y
    }

    /// Planar object points, `x` advancing fastest.
    ///
    /// Index `j * cols + i` holds `(i * s, j * s, 0)`, the same order the detector emits corners in.
    pub fn object_points(&self) -> Vec<glam::Vec3> {
        let s = self.square_size_m as f32;
        (0..self.interior_corners_y)
            .flat_map(|j| {
                (0..self.interior_corners_x).map(move |i| glam::Vec3 {
                    x: i as f32 * s,
                    y: j as f32 * s,
                    z: 0.0,
                })
            })
            .collect()
    }
}
