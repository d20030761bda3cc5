use std::path::PathBuf;
use std::sync::Arc;

/// One image's refined corners paired with the board's object points.
#[derive(Debug, Clone)]
pub struct Observation {
    pub image_index: usize,
    pub path: PathBuf,
    pub img_w_h: (u32, u32),
    pub p2ds: Vec<glam::Vec2>,
    pub p3ds: Arc<Vec<glam::Vec3>>,
}

impl Observation {
    pub fn len(&self) -> usize {
        self.p2ds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.p2ds.is_empty()
    }
}

pub type ObservationSet = Vec<Observation>;

/// What happened to a single image during detection.
#[derive(Debug, Clone)]
pub enum DetectionOutcome {
    Found {
        image_index: usize,
        path: PathBuf,
        img_w_h: (u32, u32),
        corners: Vec<glam::Vec2>,
    },
    NotFound {
        image_index: usize,
        path: PathBuf,
        img_w_h: (u32, u32),
    },
}

impl DetectionOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            DetectionOutcome::Found { path, .. } | DetectionOutcome::NotFound { path, .. } => path,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, DetectionOutcome::Found { .. })
    }
}
