use glam::Vec2;
use image::GrayImage;

/// Stopping rule and window for [`refine_corners`].
#[derive(Debug, Clone, Copy)]
pub struct SubPixParams {
    /// Half of the search window side, the window is `2 * half_window + 1` wide.
    pub half_window: i32,
    /// Half of the central dead zone, negative for none.
    pub zero_zone: i32,
    pub max_iterations: usize,
    pub epsilon: f32,
}

impl Default for SubPixParams {
    fn default() -> Self {
        Self {
            half_window: 5,
            zero_zone: -1,
            max_iterations: 30,
            epsilon: 0.001,
        }
    }
}

struct FloatImage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl FloatImage {
    fn from_gray(img: &GrayImage) -> FloatImage {
        FloatImage {
            width: img.width() as usize,
            height: img.height() as usize,
            data: img.as_raw().iter().map(|v| *v as f32).collect(),
        }
    }

    fn px(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[y * self.width + x]
    }

    fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let ax = x - x0;
        let ay = y - y0;
        let (xi, yi) = (x0 as i64, y0 as i64);
        let top = self.px(xi, yi) * (1.0 - ax) + self.px(xi + 1, yi) * ax;
        let bottom = self.px(xi, yi + 1) * (1.0 - ax) + self.px(xi + 1, yi + 1) * ax;
        top * (1.0 - ay) + bottom * ay
    }

    fn gradient(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (self.bilinear(x + 1.0, y) - self.bilinear(x - 1.0, y)) * 0.5,
            (self.bilinear(x, y + 1.0) - self.bilinear(x, y - 1.0)) * 0.5,
        )
    }
}

/// Moves each corner to the point where the surrounding image gradients are orthogonal
/// to the vectors from it, the usual saddle-point refinement.
///
/// A corner that would leave its search window keeps its input position.
pub fn refine_corners(img: &GrayImage, corners: &[Vec2], params: &SubPixParams) -> Vec<Vec2> {
    if img.width() == 0 || img.height() == 0 {
        return corners.to_vec();
    }
    let fimg = FloatImage::from_gray(img);
    let win = params.half_window.max(1);
    let norm = (win * win) as f32;
    let mut weights = Vec::with_capacity(((2 * win + 1) * (2 * win + 1)) as usize);
    for dy in -win..=win {
        for dx in -win..=win {
            let in_zero_zone = params.zero_zone >= 0 && dx.abs() <= params.zero_zone && dy.abs() <= params.zero_zone;
            let w = if in_zero_zone {
                0.0
            } else {
                (-((dx * dx + dy * dy) as f32) / norm).exp()
            };
            weights.push((dx, dy, w));
        }
    }
    let eps2 = params.epsilon * params.epsilon;

    corners
        .iter()
        .map(|start| {
            let mut q = *start;
            for _ in 0..params.max_iterations {
                let (mut a, mut b, mut c, mut bb1, mut bb2) = (0f32, 0f32, 0f32, 0f32, 0f32);
                for (dx, dy, w) in &weights {
                    let p = q + Vec2::new(*dx as f32, *dy as f32);
                    let g = fimg.gradient(p.x, p.y);
                    let gxx = g.x * g.x * w;
                    let gxy = g.x * g.y * w;
                    let gyy = g.y * g.y * w;
                    a += gxx;
                    b += gxy;
                    c += gyy;
                    bb1 += gxx * p.x + gxy * p.y;
                    bb2 += gxy * p.x + gyy * p.y;
                }
                let det = a * c - b * b;
                if det.abs() <= f32::EPSILON * (a * c).abs().max(1.0) {
                    break;
                }
                let next = Vec2::new((c * bb1 - b * bb2) / det, (a * bb2 - b * bb1) / det);
                let moved = next.distance_squared(q);
                q = next;
                if moved <= eps2 {
                    break;
                }
            }
            let drift = q - *start;
            if drift.x.abs() > win as f32 || drift.y.abs() > win as f32 || !q.is_finite() {
                *start
            } else {
                q
            }
        })
        .collect()
}
