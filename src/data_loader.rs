use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::glob;
use image::{DynamicImage, ImageReader};
use indicatif::ProgressIterator;
use log::{info, trace, warn};

use crate::board::BoardSpec;
use crate::detected_points::{DetectionOutcome, Observation, ObservationSet};
use crate::detector::{CornerDetector, DetectorFlags, SubPixParams, refine_corners};
use crate::error::{CalibError, Result};

/// Calibration images live in this subdirectory of the dataset root.
pub const IMAGE_DIR: &str = "Image";

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    if let Ok(p) = rp {
        for ext in &[".png", ".jpg"] {
            if p.as_os_str().to_string_lossy().ends_with(ext) {
                return Some(p);
            }
        }
    }
    None
}

/// `<root>/Image/*.png` and `*.jpg`, sorted lexicographically. No images is an error.
pub fn list_images(root_folder: &Path) -> Result<Vec<PathBuf>> {
    let image_dir = root_folder.join(IMAGE_DIR);
    let pattern = format!("{}/*", glob::Pattern::escape(&image_dir.to_string_lossy()));
    let mut sorted_path: Vec<PathBuf> = glob(&pattern)?.filter_map(img_filter).collect();
    sorted_path.sort();
    if sorted_path.is_empty() {
        return Err(CalibError::NoImagesFound(image_dir));
    }
    trace!("found images {:?}", sorted_path);
    Ok(sorted_path)
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let decode = || -> std::result::Result<DynamicImage, image::ImageError> {
        Ok(ImageReader::open(path)?.with_guessed_format()?.decode()?)
    };
    decode().map_err(|source| CalibError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs the detector over every image in order.
///
/// Images without a complete board are reported as `NotFound` and skipped, found corners are
/// refined to sub-pixel accuracy before they are paired with the board's object points.
/// Decoding failures abort the scan.
pub fn detect_observations(
    img_paths: &[PathBuf],
    board: &BoardSpec,
    detector: &dyn CornerDetector,
    subpix: &SubPixParams,
) -> Result<(ObservationSet, Vec<DetectionOutcome>)> {
    let p3ds = Arc::new(board.object_points());
    let flags = DetectorFlags::default();
    let mut observations = ObservationSet::new();
    let mut outcomes = Vec::with_capacity(img_paths.len());

    for (image_index, path) in img_paths.iter().enumerate().progress_count(img_paths.len() as u64) {
        let gray = load_image(path)?.to_luma8();
        let img_w_h = gray.dimensions();
        let Some(corners) = detector.detect(&gray, board.pattern_size(), flags) else {
            warn!("checkerboard not found in {}, skipped", path.display());
            outcomes.push(DetectionOutcome::NotFound {
                image_index,
                path: path.clone(),
                img_w_h,
            });
            continue;
        };
        let corners = refine_corners(&gray, &corners, subpix);
        observations.push(Observation {
            image_index,
            path: path.clone(),
            img_w_h,
            p2ds: corners.clone(),
            p3ds: p3ds.clone(),
        });
        outcomes.push(DetectionOutcome::Found {
            image_index,
            path: path.clone(),
            img_w_h,
            corners,
        });
    }
    info!(
        "checkerboard found in {} of {} images",
        observations.len(),
        img_paths.len()
    );
    Ok((observations, outcomes))
}

/// The single image size shared by all observations.
pub fn common_image_size(observations: &[Observation]) -> Result<(u32, u32)> {
    let first = observations.first().ok_or(CalibError::NoObservations)?;
    for obs in observations {
        if obs.img_w_h != first.img_w_h {
            return Err(CalibError::ImageSizeMismatch {
                path: obs.path.clone(),
                expected: first.img_w_h,
                found: obs.img_w_h,
            });
        }
    }
    Ok(first.img_w_h)
}
