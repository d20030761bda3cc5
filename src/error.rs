use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    #[error("No images found in {0}")]
    NoImagesFound(PathBuf),
    #[error("Invalid checkerboard: {rows} rows x {cols} cols, both must be positive")]
    InvalidBoard { rows: usize, cols: usize },
    #[error("Square size must be a positive number, got {0} mm")]
    InvalidSquareSize(f64),
    #[error("Checkerboard was not detected in any image, nothing to calibrate")]
    NoObservations,
    #[error("Image {path} is {found:?} but earlier detections are {expected:?}")]
    ImageSizeMismatch {
        path: PathBuf,
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Image is empty")]
    EmptyImage,
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Degenerate homography: {0}")]
    DegenerateHomography(String),
    #[error("Solver failed: {0}")]
    Solver(String),
    #[error("Preview failed: {0}")]
    Preview(String),
    #[error("Invalid camera info: {0}")]
    InvalidCameraInfo(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl From<rerun::RecordingStreamError> for CalibError {
    fn from(err: rerun::RecordingStreamError) -> Self {
        CalibError::Preview(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CalibError>;
