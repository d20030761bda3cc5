pub mod board;
pub mod camera_model;
pub mod data_loader;
pub mod detected_points;
pub mod detector;
pub mod error;
pub mod io;
pub mod optimization;
pub mod pipeline;
pub mod synthetic;
pub mod types;
pub mod visualization;

pub use detector::get_corners;
pub use error::{CalibError, Result};
