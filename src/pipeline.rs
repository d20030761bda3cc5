use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn};

use crate::board::BoardSpec;
use crate::data_loader::{common_image_size, detect_observations, list_images};
use crate::detector::{ChessboardDetector, SubPixParams};
use crate::error::{CalibError, Result};
use crate::io::{CameraInfoRecord, write_camera_info, write_detailed_report};
use crate::optimization::{CalibrationSolver, PlanarCalibrator};
use crate::types::CalibrationResult;
use crate::visualization::{PreviewMode, create_recording, log_detections, log_undistortion};

/// How many leading images get an undistortion preview.
pub const UNDISTORT_PREVIEW_COUNT: usize = 2;

#[derive(Debug, Clone)]
pub struct CalibrationRun {
    pub root: PathBuf,
    pub board: BoardSpec,
    pub config_dir: PathBuf,
    pub preview: PreviewMode,
    pub rrd_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

impl CalibrationRun {
    /// `<config_dir>/<basename(root)>.yaml`
    pub fn output_path(&self) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "camera".to_string());
        self.config_dir.join(format!("{}.yaml", name))
    }
}

fn log_result(result: &CalibrationResult) {
    let k = &result.camera_matrix;
    info!("Camera matrix (K):");
    for r in 0..3 {
        info!("  [{:.8} {:.8} {:.8}]", k[(r, 0)], k[(r, 1)], k[(r, 2)]);
    }
    info!("Distortion coefficients (D): {:?}", result.distortion_coeffs);
    info!(
        "Height : {}, Width : {}",
        result.image_size.1, result.image_size.0
    );
}

/// Load, detect, solve, preview, export. Returns the camera_info path and the solve.
///
/// The YAML is only written after a successful solve; preview failures only warn.
pub fn run_calibration(run: &CalibrationRun) -> Result<(PathBuf, CalibrationResult)> {
    info!(
        "Checkerboard: {:?}, Square Size: {} m",
        run.board.pattern_size(),
        run.board.square_size_m
    );
    let img_paths = list_images(&run.root)?;
    info!("{} images under {}", img_paths.len(), run.root.display());

    let now = Instant::now();
    let detector = ChessboardDetector::default();
    let (observations, outcomes) =
        detect_observations(&img_paths, &run.board, &detector, &SubPixParams::default())?;
    let duration_sec = now.elapsed().as_secs_f64();
    info!("detecting corners took {:.6} sec", duration_sec);
    if observations.is_empty() {
        return Err(CalibError::NoObservations);
    }
    let image_size = common_image_size(&observations)?;

    let recording = match create_recording(run.preview, &run.rrd_path) {
        Ok(recording) => recording,
        Err(e) => {
            warn!("preview disabled: {}", e);
            None
        }
    };
    if let Some(recording) = &recording {
        log_detections(recording, &observations, run.board.cols(), run.board.rows());
    }

    let result = PlanarCalibrator::new().calibrate(&observations, image_size)?;
    log_result(&result);

    if let Some(recording) = &recording {
        log_undistortion(recording, &img_paths, &result, UNDISTORT_PREVIEW_COUNT);
    }

    let output_path = run.output_path();
    write_camera_info(&output_path, &CameraInfoRecord::from_calibration(&result))?;

    if let Some(report_path) = &run.report_path {
        let skipped: Vec<PathBuf> = outcomes
            .iter()
            .filter(|o| !o.is_found())
            .map(|o| o.path().clone())
            .collect();
        write_detailed_report(report_path, &run.board, &result, &observations, &skipped)?;
        info!("report written to {}", report_path.display());
    }
    Ok((output_path, result))
}
