//! Bridges calibration output to `camera_intrinsic_model::OpenCVModel5`.

use camera_intrinsic_model::{OpenCVModel5, init_undistort_map, remap};
use image::{DynamicImage, GenericImageView};
use nalgebra as na;

/// Model from a pinhole matrix and `k1, k2, p1, p2, k3`.
pub fn opencv5_from_k_and_d(
    camera_matrix: &na::Matrix3<f64>,
    dist: &[f64; 5],
    width: u32,
    height: u32,
) -> OpenCVModel5<f64> {
    let params = na::dvector![
        camera_matrix[(0, 0)],
        camera_matrix[(1, 1)],
        camera_matrix[(0, 2)],
        camera_matrix[(1, 2)],
        dist[0],
        dist[1],
        dist[2],
        dist[3],
        dist[4]
    ];
    OpenCVModel5::new(&params, width, height)
}

pub fn camera_matrix_of(model: &OpenCVModel5<f64>) -> na::Matrix3<f64> {
    na::Matrix3::new(model.fx, 0.0, model.cx, 0.0, model.fy, model.cy, 0.0, 0.0, 1.0)
}

/// Undistorts `img` onto `camera_matrix` at the same size, keeping its pixel format.
/// Pixels that map outside the source are black.
pub fn undistort_image(model: &OpenCVModel5<f64>, camera_matrix: &na::Matrix3<f64>, img: &DynamicImage) -> DynamicImage {
    let (xmap, ymap) = init_undistort_map(model, camera_matrix, img.dimensions(), None);
    remap(img, &xmap, &ymap)
}
