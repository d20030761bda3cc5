use log::debug;
use nalgebra as na;

use crate::error::{CalibError, Result};

/// Similarity that moves the centroid to the origin and the mean distance to sqrt(2).
fn hartley_normalization(points: &[na::Vector2<f64>]) -> na::Matrix3<f64> {
    let n = points.len() as f64;
    let mean = points.iter().fold(na::Vector2::<f64>::zeros(), |acc, p| acc + p) / n;
    let mean_dist = points.iter().map(|p| (p - mean).norm()).sum::<f64>() / n;
    let scale = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    na::Matrix3::new(
        scale,
        0.0,
        -mean.x * scale,
        0.0,
        scale,
        -mean.y * scale,
        0.0,
        0.0,
        1.0,
    )
}

fn apply(t: &na::Matrix3<f64>, p: &na::Vector2<f64>) -> na::Vector2<f64> {
    let q = t * na::Vector3::new(p.x, p.y, 1.0);
    na::Vector2::new(q.x / q.z, q.y / q.z)
}

/// Plane-to-image homography by normalized DLT, scaled so `H[(2, 2)] == 1`.
pub fn homography_dlt(board: &[na::Vector2<f64>], image: &[na::Vector2<f64>]) -> Result<na::Matrix3<f64>> {
    if board.len() != image.len() || board.len() < 4 {
        return Err(CalibError::DegenerateHomography(format!(
            "need at least 4 point pairs, got {} and {}",
            board.len(),
            image.len()
        )));
    }
    let ts = hartley_normalization(board);
    let td = hartley_normalization(image);
    let mut ata = na::SMatrix::<f64, 9, 9>::zeros();
    for (src, dst) in board.iter().zip(image) {
        let s = apply(&ts, src);
        let d = apply(&td, dst);
        let r0 = na::SVector::<f64, 9>::from_column_slice(&[
            -s.x,
            -s.y,
            -1.0,
            0.0,
            0.0,
            0.0,
            d.x * s.x,
            d.x * s.y,
            d.x,
        ]);
        let r1 = na::SVector::<f64, 9>::from_column_slice(&[
            0.0,
            0.0,
            0.0,
            -s.x,
            -s.y,
            -1.0,
            d.y * s.x,
            d.y * s.y,
            d.y,
        ]);
        ata += r0 * r0.transpose() + r1 * r1.transpose();
    }
    let eigen = ata.symmetric_eigen();
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .ok_or_else(|| CalibError::DegenerateHomography("empty eigen decomposition".to_string()))?;
    let h = eigen.eigenvectors.column(min_idx);
    let hn = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    let td_inv = td
        .try_inverse()
        .ok_or_else(|| CalibError::DegenerateHomography("image points collapse".to_string()))?;
    let hm = td_inv * hn * ts;
    if hm[(2, 2)].abs() < 1e-12 || hm.iter().any(|v| !v.is_finite()) {
        return Err(CalibError::DegenerateHomography(
            "homography is not normalizable".to_string(),
        ));
    }
    Ok(hm / hm[(2, 2)])
}

/// Focal lengths from per-view homographies with the principal point held at `(cx, cy)`.
///
/// Each view contributes the two orthonormality constraints of the rotation columns,
/// solved in least squares for `1 / fx^2` and `1 / fy^2`. Falls back to `fallback_f` when
/// the system is degenerate.
pub fn init_focal(homographies: &[na::Matrix3<f64>], cx: f64, cy: f64, fallback_f: f64) -> (f64, f64) {
    let shift_inv = na::Matrix3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);
    let mut ata = na::Matrix2::<f64>::zeros();
    let mut atb = na::Vector2::<f64>::zeros();
    for h in homographies {
        let hc = shift_inv * h;
        let h1 = hc.column(0).into_owned();
        let h2 = hc.column(1).into_owned();
        let d1 = (h1 + h2) * 0.5;
        let d2 = (h1 - h2) * 0.5;
        for (a, b) in [(h1, h2), (d1, d2)] {
            let weight = a.norm() * b.norm();
            if weight < 1e-12 {
                continue;
            }
            let row = na::Vector2::new(a[0] * b[0], a[1] * b[1]) / weight;
            let rhs = -a[2] * b[2] / weight;
            ata += row * row.transpose();
            atb += row * rhs;
        }
    }
    let solved = ata.try_inverse().map(|inv| inv * atb);
    match solved {
        Some(f) if f[0] > 0.0 && f[1] > 0.0 && f.iter().all(|v| v.is_finite()) => {
            let fx = (1.0 / f[0]).sqrt();
            let fy = (1.0 / f[1]).sqrt();
            debug!("initial focal {:.3} {:.3}", fx, fy);
            (fx, fy)
        }
        _ => {
            debug!("focal init degenerate, using {:.1}", fallback_f);
            (fallback_f, fallback_f)
        }
    }
}

/// Board pose from a homography and the intrinsic matrix. Returns `(R, t)` with the
/// board in front of the camera.
pub fn pose_from_homography(k: &na::Matrix3<f64>, h: &na::Matrix3<f64>) -> Result<(na::Rotation3<f64>, na::Vector3<f64>)> {
    let k_inv = k
        .try_inverse()
        .ok_or_else(|| CalibError::DegenerateHomography("singular camera matrix".to_string()))?;
    let r1_raw = k_inv * h.column(0);
    let r2_raw = k_inv * h.column(1);
    let t_raw = k_inv * h.column(2);
    let norm = r1_raw.norm();
    if norm < 1e-12 {
        return Err(CalibError::DegenerateHomography("zero first column".to_string()));
    }
    let mut scale = 1.0 / norm;
    if t_raw.z * scale < 0.0 {
        scale = -scale;
    }
    let r1 = r1_raw * scale;
    let r2 = r2_raw * scale;
    let r3 = r1.cross(&r2);
    let r = na::Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(CalibError::DegenerateHomography("svd failed".to_string()));
    };
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        r = -r;
    }
    Ok((na::Rotation3::from_matrix_unchecked(r), t_raw * scale))
}
