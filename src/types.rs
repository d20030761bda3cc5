use camera_intrinsic_model::OpenCVModel5;
use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::camera_model::opencv5_from_k_and_d;

/// Board-to-camera pose as a Rodrigues rotation vector and a translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RvecTvec {
    rvec: [f64; 3],
    tvec: [f64; 3],
}

impl RvecTvec {
    pub fn new(rvec: &na::DVector<f64>, tvec: &na::DVector<f64>) -> RvecTvec {
        RvecTvec {
            rvec: [rvec[0], rvec[1], rvec[2]],
            tvec: [tvec[0], tvec[1], tvec[2]],
        }
    }

    pub fn from_isometry(transform: &na::Isometry3<f64>) -> RvecTvec {
        let r = transform.rotation.scaled_axis();
        let t = transform.translation.vector;
        RvecTvec {
            rvec: [r.x, r.y, r.z],
            tvec: [t.x, t.y, t.z],
        }
    }

    pub fn na_rvec(&self) -> na::DVector<f64> {
        na::dvector![self.rvec[0], self.rvec[1], self.rvec[2]]
    }

    pub fn na_tvec(&self) -> na::DVector<f64> {
        na::dvector![self.tvec[0], self.tvec[1], self.tvec[2]]
    }

    pub fn rvec(&self) -> [f64; 3] {
        self.rvec
    }

    pub fn tvec(&self) -> [f64; 3] {
        self.tvec
    }

    pub fn to_isometry(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(
            na::Vector3::from(self.tvec),
            na::Vector3::from(self.rvec),
        )
    }
}

/// Output of one calibration solve.
#[derive(Debug, Clone)]
pub struct CalibrationResult {
    pub camera_matrix: na::Matrix3<f64>,
    /// `k1, k2, p1, p2, k3`
    pub distortion_coeffs: [f64; 5],
    pub image_size: (u32, u32),
    pub poses: Vec<RvecTvec>,
    pub rms: f64,
    pub per_view_rms: Vec<f64>,
}

impl CalibrationResult {
    pub fn fx(&self) -> f64 {
        self.camera_matrix[(0, 0)]
    }
    pub fn fy(&self) -> f64 {
        self.camera_matrix[(1, 1)]
    }
    pub fn cx(&self) -> f64 {
        self.camera_matrix[(0, 2)]
    }
    pub fn cy(&self) -> f64 {
        self.camera_matrix[(1, 2)]
    }

    pub fn model(&self) -> OpenCVModel5<f64> {
        opencv5_from_k_and_d(
            &self.camera_matrix,
            &self.distortion_coeffs,
            self.image_size.0,
            self.image_size.1,
        )
    }
}
