use std::collections::HashMap;

use camera_intrinsic_model::{CameraModel, OpenCVModel5};
use log::{debug, info};
use nalgebra as na;
use tiny_solver::{LevenbergMarquardtOptimizer, Optimizer};

use super::factors::{ReprojectionFactor, rodrigues_rotate};
use super::homography::{homography_dlt, init_focal, pose_from_homography};
use crate::camera_model::camera_matrix_of;
use crate::detected_points::Observation;
use crate::error::{CalibError, Result};
use crate::types::{CalibrationResult, RvecTvec};

const INTRINSICS: &str = "intrinsics";

/// Turns an observation set into intrinsics, distortion and per-view poses.
pub trait CalibrationSolver {
    fn calibrate(&self, observations: &[Observation], image_size: (u32, u32)) -> Result<CalibrationResult>;
}

/// Planar-target calibration: closed-form start, one joint Levenberg-Marquardt refinement
/// over all nine `OpenCVModel5` parameters and every view's pose.
#[derive(Debug, Clone, Default)]
pub struct PlanarCalibrator;

fn rvec_key(view: usize) -> String {
    format!("rvec{}", view)
}

fn tvec_key(view: usize) -> String {
    format!("tvec{}", view)
}

/// Root mean square pixel error of one view under `model` and `pose`.
pub fn view_rms(model: &OpenCVModel5<f64>, pose: &RvecTvec, observation: &Observation) -> (f64, usize) {
    let rvec = na::Vector3::from(pose.rvec());
    let tvec = na::Vector3::from(pose.tvec());
    let sq_sum: f64 = observation
        .p3ds
        .iter()
        .zip(&observation.p2ds)
        .map(|(p3d, p2d)| {
            let p = na::Vector3::new(p3d.x as f64, p3d.y as f64, p3d.z as f64);
            let p_cam = rodrigues_rotate(&rvec, &p) + tvec;
            let proj = model.project_one(&p_cam);
            (proj - na::Vector2::new(p2d.x as f64, p2d.y as f64)).norm_squared()
        })
        .sum();
    (sq_sum, observation.len())
}

impl PlanarCalibrator {
    pub fn new() -> PlanarCalibrator {
        PlanarCalibrator
    }

    fn initial_guess(
        &self,
        observations: &[Observation],
        image_size: (u32, u32),
    ) -> Result<(na::DVector<f64>, Vec<RvecTvec>)> {
        let homographies = observations
            .iter()
            .map(|obs| {
                let board: Vec<na::Vector2<f64>> = obs
                    .p3ds
                    .iter()
                    .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
                    .collect();
                let image: Vec<na::Vector2<f64>> = obs
                    .p2ds
                    .iter()
                    .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
                    .collect();
                homography_dlt(&board, &image)
            })
            .collect::<Result<Vec<_>>>()?;

        let cx = (image_size.0 as f64 - 1.0) * 0.5;
        let cy = (image_size.1 as f64 - 1.0) * 0.5;
        let (fx, fy) = init_focal(&homographies, cx, cy, image_size.0.max(image_size.1) as f64);
        let k = na::Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);
        let poses = homographies
            .iter()
            .map(|h| {
                let (r, t) = pose_from_homography(&k, h)?;
                Ok(RvecTvec::from_isometry(&na::Isometry3::from_parts(
                    na::Translation3::from(t),
                    na::UnitQuaternion::from_rotation_matrix(&r),
                )))
            })
            .collect::<Result<Vec<_>>>()?;
        let intrinsics = na::dvector![fx, fy, cx, cy, 0.0, 0.0, 0.0, 0.0, 0.0];
        Ok((intrinsics, poses))
    }
}

impl CalibrationSolver for PlanarCalibrator {
    fn calibrate(&self, observations: &[Observation], image_size: (u32, u32)) -> Result<CalibrationResult> {
        if observations.is_empty() {
            return Err(CalibError::NoObservations);
        }
        let (width, height) = image_size;
        let (intrinsics, init_poses) = self.initial_guess(observations, image_size)?;
        debug!("initial intrinsics {:?}", intrinsics.as_slice());

        let mut problem = tiny_solver::Problem::new();
        let mut initial_values = HashMap::<String, na::DVector<f64>>::new();
        initial_values.insert(INTRINSICS.to_string(), intrinsics);
        for (view, (obs, pose)) in observations.iter().zip(&init_poses).enumerate() {
            let rkey = rvec_key(view);
            let tkey = tvec_key(view);
            for (p3d, p2d) in obs.p3ds.iter().zip(&obs.p2ds) {
                let cost = ReprojectionFactor::new(width, height, p3d, p2d);
                problem.add_residual_block(2, &[INTRINSICS, &rkey, &tkey], Box::new(cost), None);
            }
            initial_values.insert(rkey, pose.na_rvec());
            initial_values.insert(tkey, pose.na_tvec());
        }

        let optimizer = LevenbergMarquardtOptimizer::default();
        let result = optimizer
            .optimize(&problem, &initial_values, None)
            .ok_or_else(|| CalibError::Solver("Levenberg-Marquardt did not converge".to_string()))?;

        let params = result
            .get(INTRINSICS)
            .ok_or_else(|| CalibError::Solver("intrinsics missing from solution".to_string()))?;
        if params.iter().any(|v| !v.is_finite()) || params[0] <= 0.0 || params[1] <= 0.0 {
            return Err(CalibError::Solver(format!(
                "invalid intrinsics {:?}",
                params.as_slice()
            )));
        }
        let model = OpenCVModel5::new(params, width, height);

        let poses = (0..observations.len())
            .map(|view| {
                let rvec = result.get(&rvec_key(view));
                let tvec = result.get(&tvec_key(view));
                match (rvec, tvec) {
                    (Some(r), Some(t)) => Ok(RvecTvec::new(r, t)),
                    _ => Err(CalibError::Solver(format!("pose {} missing from solution", view))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let per_view: Vec<(f64, usize)> = observations
            .iter()
            .zip(&poses)
            .map(|(obs, pose)| view_rms(&model, pose, obs))
            .collect();
        let total_sq: f64 = per_view.iter().map(|(sq, _)| sq).sum();
        let total_pts: usize = per_view.iter().map(|(_, n)| n).sum();
        let rms = (total_sq / total_pts.max(1) as f64).sqrt();
        let per_view_rms = per_view
            .iter()
            .map(|(sq, n)| (sq / (*n).max(1) as f64).sqrt())
            .collect();
        info!("reprojection rms {:.5} px over {} views", rms, observations.len());

        Ok(CalibrationResult {
            camera_matrix: camera_matrix_of(&model),
            distortion_coeffs: [model.k1, model.k2, model.p1, model.p2, model.k3],
            image_size,
            poses,
            rms,
            per_view_rms,
        })
    }
}
