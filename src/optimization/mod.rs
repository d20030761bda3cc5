pub mod factors;
pub mod homography;
pub mod solver;

pub use homography::*;
pub use solver::*;
