use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{CalibError, Result};
use crate::types::CalibrationResult;

pub const CAMERA_NAME: &str = "my_camera";
pub const DISTORTION_MODEL: &str = "plumb_bob";
const DECIMALS: usize = 8;

/// Serializes an object to a pretty JSON file.
pub fn object_to_json<T: Serialize>(output_path: &Path, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// `value` rounded half-to-even on its exact decimal expansion, like Python's `round(v, 8)`.
pub fn round_decimals(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Shortest round-trip float text in the form YAML 1.1 readers take as a float:
/// always a `.` in the mantissa, exponents as `e-05` / `e+16`.
pub fn format_yaml_float(value: f64) -> String {
    if value.is_nan() {
        return ".nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { ".inf" } else { "-.inf" }.to_string();
    }
    let debug = format!("{:?}", value);
    match debug.split_once('e') {
        None => debug,
        Some((mantissa, exponent)) => {
            let mantissa = if mantissa.contains('.') {
                mantissa.to_string()
            } else {
                format!("{}.0", mantissa)
            };
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
    }
}

/// A `rows x cols` matrix block of a camera_info file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl MatrixRecord {
    fn new(rows: usize, cols: usize, data: Vec<f64>) -> MatrixRecord {
        MatrixRecord { rows, cols, data }
    }

    fn write(&self, out: &mut String, key: &str) {
        let data: Vec<String> = self.data.iter().map(|v| format_yaml_float(*v)).collect();
        out.push_str(&format!("{}:\n", key));
        out.push_str(&format!("  rows: {}\n", self.rows));
        out.push_str(&format!("  cols: {}\n", self.cols));
        out.push_str(&format!("  data: [{}]\n", data.join(", ")));
    }
}

/// ROS `sensor_msgs/CameraInfo` calibration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfoRecord {
    pub camera_name: String,
    pub image_width: u32,
    pub image_height: u32,
    pub camera_matrix: MatrixRecord,
    pub distortion_model: String,
    pub distortion_coefficients: MatrixRecord,
    pub rectification_matrix: MatrixRecord,
    pub projection_matrix: MatrixRecord,
}

impl CameraInfoRecord {
    pub fn from_calibration(result: &CalibrationResult) -> CameraInfoRecord {
        let r = |v: f64| round_decimals(v, DECIMALS);
        let (fx, fy, cx, cy) = (r(result.fx()), r(result.fy()), r(result.cx()), r(result.cy()));
        CameraInfoRecord {
            camera_name: CAMERA_NAME.to_string(),
            image_width: result.image_size.0,
            image_height: result.image_size.1,
            camera_matrix: MatrixRecord::new(3, 3, vec![fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0]),
            distortion_model: DISTORTION_MODEL.to_string(),
            distortion_coefficients: MatrixRecord::new(
                1,
                5,
                result.distortion_coeffs.iter().map(|v| r(*v)).collect(),
            ),
            rectification_matrix: MatrixRecord::new(
                3,
                3,
                vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            ),
            projection_matrix: MatrixRecord::new(
                3,
                4,
                vec![fx, 0.0, cx, 0.0, 0.0, fy, cy, 0.0, 0.0, 0.0, 1.0, 0.0],
            ),
        }
    }

    /// Block-style mapping in the fixed ROS key order, numeric arrays as one-line flow sequences.
    pub fn to_yaml_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("camera_name: {}\n", self.camera_name));
        out.push_str(&format!("image_width: {}\n", self.image_width));
        out.push_str(&format!("image_height: {}\n", self.image_height));
        self.camera_matrix.write(&mut out, "camera_matrix");
        out.push_str(&format!("distortion_model: {}\n", self.distortion_model));
        self.distortion_coefficients.write(&mut out, "distortion_coefficients");
        self.rectification_matrix.write(&mut out, "rectification_matrix");
        self.projection_matrix.write(&mut out, "projection_matrix");
        out
    }

    fn validate(&self) -> Result<()> {
        let blocks = [
            ("camera_matrix", &self.camera_matrix, 3, 3),
            ("distortion_coefficients", &self.distortion_coefficients, 1, 5),
            ("rectification_matrix", &self.rectification_matrix, 3, 3),
            ("projection_matrix", &self.projection_matrix, 3, 4),
        ];
        for (name, block, rows, cols) in blocks {
            if block.rows != rows || block.cols != cols || block.data.len() != rows * cols {
                return Err(CalibError::InvalidCameraInfo(format!(
                    "{} should be {}x{} with {} values, got {}x{} with {}",
                    name,
                    rows,
                    cols,
                    rows * cols,
                    block.rows,
                    block.cols,
                    block.data.len()
                )));
            }
        }
        Ok(())
    }
}

/// Writes the camera_info file in a single write. The parent directory must exist.
pub fn write_camera_info(output_path: &Path, record: &CameraInfoRecord) -> Result<()> {
    std::fs::write(output_path, record.to_yaml_string())?;
    log::info!("Saved to {} in ROS camera_info format.", output_path.display());
    Ok(())
}

pub fn read_camera_info(file_path: &Path) -> Result<CameraInfoRecord> {
    let contents = std::fs::read_to_string(file_path)?;
    let record: CameraInfoRecord = serde_yaml::from_str(&contents)?;
    record.validate()?;
    Ok(record)
}

#[derive(Serialize)]
struct ViewReport {
    image: String,
    rms_error: f64,
    point_count: usize,
    rvec: [f64; 3],
    tvec: [f64; 3],
}

/// Detailed calibration report, written as JSON.
#[derive(Serialize)]
struct CalibrationReport {
    timestamp: String,
    board_cols: usize,
    board_rows: usize,
    square_size_m: f64,
    image_width: u32,
    image_height: u32,
    camera_matrix: [[f64; 3]; 3],
    distortion_coefficients: [f64; 5],
    overall_rms: f64,
    total_points: usize,
    views: Vec<ViewReport>,
    skipped_images: Vec<String>,
}

pub fn write_detailed_report(
    output_path: &Path,
    board: &crate::board::BoardSpec,
    result: &CalibrationResult,
    observations: &[crate::detected_points::Observation],
    skipped: &[std::path::PathBuf],
) -> Result<()> {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let k = &result.camera_matrix;
    let views = observations
        .iter()
        .zip(result.poses.iter().zip(&result.per_view_rms))
        .map(|(obs, (pose, rms))| ViewReport {
            image: obs.path.display().to_string(),
            rms_error: *rms,
            point_count: obs.len(),
            rvec: pose.rvec(),
            tvec: pose.tvec(),
        })
        .collect();
    let report = CalibrationReport {
        timestamp: now.to_string(),
        board_cols: board.cols(),
        board_rows: board.rows(),
        square_size_m: board.square_size_m,
        image_width: result.image_size.0,
        image_height: result.image_size.1,
        camera_matrix: [
            [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
            [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
            [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
        ],
        distortion_coefficients: result.distortion_coeffs,
        overall_rms: result.rms,
        total_points: observations.iter().map(|o| o.len()).sum(),
        views,
        skipped_images: skipped.iter().map(|p| p.display().to_string()).collect(),
    };
    object_to_json(output_path, &report)
}
