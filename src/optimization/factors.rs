use nalgebra as na;
use tiny_solver::factors::Factor;

use camera_intrinsic_model::{CameraModel, OpenCVModel5};

/// Rotates `p` by the Rodrigues vector `rvec`.
///
/// Near zero rotation the first-order form is used so derivatives stay finite.
pub fn rodrigues_rotate<T: na::RealField>(rvec: &na::Vector3<T>, p: &na::Vector3<T>) -> na::Vector3<T> {
    let theta2 = rvec.norm_squared();
    let tiny: T = na::convert(1e-16);
    if theta2 > tiny {
        let theta = theta2.sqrt();
        let axis = rvec / theta.clone();
        let (sin, cos) = (theta.clone().sin(), theta.cos());
        let k_dot_p = axis.dot(p);
        p * cos.clone() + axis.cross(p) * sin + axis * (k_dot_p * (T::one() - cos))
    } else {
        p + rvec.cross(p)
    }
}

/// Pixel residual of one board corner.
///
/// params: `[intrinsics(9), rvec(3), tvec(3)]`.
pub struct ReprojectionFactor {
    pub width: u32,
    pub height: u32,
    pub p3d: na::Vector3<f64>,
    pub p2d: na::Vector2<f64>,
}

impl ReprojectionFactor {
    pub fn new(width: u32, height: u32, p3d: &glam::Vec3, p2d: &glam::Vec2) -> ReprojectionFactor {
        ReprojectionFactor {
            width,
            height,
            p3d: na::Vector3::new(p3d.x as f64, p3d.y as f64, p3d.z as f64),
            p2d: na::Vector2::new(p2d.x as f64, p2d.y as f64),
        }
    }
}

impl<T: na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let model = OpenCVModel5::new(&params[0], self.width, self.height);
        let rvec = na::Vector3::new(
            params[1][0].clone(),
            params[1][1].clone(),
            params[1][2].clone(),
        );
        let tvec = na::Vector3::new(
            params[2][0].clone(),
            params[2][1].clone(),
            params[2][2].clone(),
        );
        let p3d: na::Vector3<T> = self.p3d.map(|v| na::convert(v));
        let p3d_t = rodrigues_rotate(&rvec, &p3d) + tvec;
        let p2d_p = model.project_one(&p3d_t);
        let u: T = na::convert(self.p2d.x);
        let v: T = na::convert(self.p2d.y);
        na::dvector![p2d_p[0].clone() - u, p2d_p[1].clone() - v]
    }
}
