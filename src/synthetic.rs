//! Renders checkerboard images for a known camera and pose.

use camera_intrinsic_model::{CameraModel, OpenCVModel5};
use image::GrayImage;
use nalgebra as na;
use rand::Rng;
use rayon::prelude::*;

use crate::board::BoardSpec;
use crate::types::RvecTvec;

const SUPERSAMPLE: u32 = 4;
const BLACK: f64 = 20.0;
const WHITE: f64 = 235.0;
const BACKGROUND: f64 = 150.0;

/// Gray level of the board plane at `(x, y)` metres.
///
/// Squares span indices `-1..=cols-1` by `-1..=rows-1` so every object point is an interior
/// corner, framed by one square of white margin.
fn board_intensity(board: &BoardSpec, x: f64, y: f64) -> f64 {
    let s = board.square_size_m;
    let ci = (x / s).floor() as i64;
    let cj = (y / s).floor() as i64;
    let (cols, rows) = (board.cols() as i64, board.rows() as i64);
    if ci < -2 || cj < -2 || ci > cols || cj > rows {
        BACKGROUND
    } else if ci == -2 || cj == -2 || ci == cols || cj == rows {
        WHITE
    } else if (ci + cj).rem_euclid(2) == 0 {
        BLACK
    } else {
        WHITE
    }
}

/// Renders `board` seen by `camera` at board-to-camera `pose`, antialiased by supersampling.
///
/// Pixels are traced back with `unproject_one`, which inverts only the radial part exactly,
/// so `p1` and `p2` should be zero for pixel-accurate renders.
pub fn render_board(camera: &OpenCVModel5<f64>, pose: &RvecTvec, board: &BoardSpec) -> GrayImage {
    let (width, height) = (camera.width, camera.height);
    let transform = pose.to_isometry();
    let rot = transform.rotation.to_rotation_matrix();
    let normal = rot * na::Vector3::z();
    let origin = transform.translation.vector;
    let plane_d = normal.dot(&origin);
    let step = 1.0 / SUPERSAMPLE as f64;

    let pixels: Vec<u8> = (0..height)
        .into_par_iter()
        .flat_map_iter(|v| {
            let rot = &rot;
            (0..width).map(move |u| {
                let mut acc = 0.0;
                for sy in 0..SUPERSAMPLE {
                    for sx in 0..SUPERSAMPLE {
                        let px = u as f64 - 0.5 + (sx as f64 + 0.5) * step;
                        let py = v as f64 - 0.5 + (sy as f64 + 0.5) * step;
                        let ray = camera.unproject_one(&na::Vector2::new(px, py));
                        let denom = normal.dot(&ray);
                        acc += if denom.abs() < 1e-12 {
                            BACKGROUND
                        } else {
                            let s = plane_d / denom;
                            if s <= 0.0 {
                                BACKGROUND
                            } else {
                                let p_board = rot.inverse() * (ray * s - origin);
                                board_intensity(board, p_board.x, p_board.y)
                            }
                        };
                    }
                }
                (acc / (SUPERSAMPLE * SUPERSAMPLE) as f64).round().clamp(0.0, 255.0) as u8
            })
        })
        .collect();
    GrayImage::from_raw(width, height, pixels).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Where each object point lands in the image, in board order.
pub fn project_board(camera: &OpenCVModel5<f64>, pose: &RvecTvec, board: &BoardSpec) -> Vec<glam::Vec2> {
    let transform = pose.to_isometry();
    board
        .object_points()
        .iter()
        .map(|p| {
            let p_cam = transform * na::Point3::new(p.x as f64, p.y as f64, p.z as f64);
            let uv = camera.project_one(&p_cam.coords);
            glam::Vec2::new(uv.x as f32, uv.y as f32)
        })
        .collect()
}

/// A pose that frames the whole board at `distance` metres, tilted by up to `max_tilt` radians.
pub fn random_pose<R: Rng>(rng: &mut R, board: &BoardSpec, distance: f64, max_tilt: f64) -> RvecTvec {
    let s = board.square_size_m;
    let center = na::Vector3::new(
        (board.cols() as f64 - 1.0) * s * 0.5,
        (board.rows() as f64 - 1.0) * s * 0.5,
        0.0,
    );
    let rvec = na::Vector3::new(
        rng.random_range(-max_tilt..max_tilt),
        rng.random_range(-max_tilt..max_tilt),
        rng.random_range(-max_tilt..max_tilt) * 0.5,
    );
    let rot = na::Rotation3::from_scaled_axis(rvec);
    let shift = na::Vector3::new(
        rng.random_range(-0.1..0.1) * distance,
        rng.random_range(-0.1..0.1) * distance,
        distance * rng.random_range(0.9..1.1),
    );
    let tvec = shift - rot * center;
    RvecTvec::new(
        &na::dvector![rvec.x, rvec.y, rvec.z],
        &na::dvector![tvec.x, tvec.y, tvec.z],
    )
}
