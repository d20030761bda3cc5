use std::fs;
use std::path::PathBuf;

use checkerboard_camera_calibration::board::BoardSpec;
use checkerboard_camera_calibration::camera_model::opencv5_from_k_and_d;
use checkerboard_camera_calibration::data_loader::IMAGE_DIR;
use checkerboard_camera_calibration::io::{CameraInfoRecord, write_camera_info};
use checkerboard_camera_calibration::synthetic::{random_pose, render_board};
use checkerboard_camera_calibration::types::CalibrationResult;
use clap::Parser;
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Parser)]
#[command(author, version, about = "Generate a synthetic checkerboard calibration dataset", long_about = None)]
struct Args {
    /// Output dataset root, images go to <output>/Image
    #[arg(short, long)]
    output: PathBuf,

    /// Number of frames to generate
    #[arg(short, long, default_value = "20")]
    num_frames: usize,

    /// Checkerboard interior corners: rows cols
    #[arg(long, num_args = 2, default_values_t = [6, 8])]
    checkerboard: Vec<usize>,

    /// Square edge in millimetres
    #[arg(long = "square_size", default_value_t = 30.0)]
    square_size: f64,

    /// Camera intrinsics: fx fy cx cy
    #[arg(long, num_args = 4, default_values_t = [600.0, 600.0, 320.0, 240.0])]
    intrinsics: Vec<f64>,

    /// Distortion: k1 k2 p1 p2 k3
    #[arg(long, num_args = 5, allow_negative_numbers = true, default_values_t = [-0.1, 0.02, 0.0, 0.0, 0.0])]
    distortion: Vec<f64>,

    #[arg(long, default_value = "640")]
    width: u32,

    #[arg(long, default_value = "480")]
    height: u32,

    /// Board distance in metres
    #[arg(long, default_value = "0.6")]
    distance: f64,

    #[arg(long, default_value = "0")]
    seed: u64,
}

fn generate_dataset(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let board = BoardSpec::from_rows_cols(args.checkerboard[0], args.checkerboard[1], args.square_size)?;
    let k = na::Matrix3::new(
        args.intrinsics[0],
        0.0,
        args.intrinsics[2],
        0.0,
        args.intrinsics[1],
        args.intrinsics[3],
        0.0,
        0.0,
        1.0,
    );
    let dist = [
        args.distortion[0],
        args.distortion[1],
        args.distortion[2],
        args.distortion[3],
        args.distortion[4],
    ];
    let camera = opencv5_from_k_and_d(&k, &dist, args.width, args.height);

    let image_dir = args.output.join(IMAGE_DIR);
    fs::create_dir_all(&image_dir)?;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut poses = Vec::with_capacity(args.num_frames);
    for frame_idx in 0..args.num_frames {
        let pose = random_pose(&mut rng, &board, args.distance, 0.35);
        let img = render_board(&camera, &pose, &board);
        img.save(image_dir.join(format!("{:06}.png", frame_idx)))?;
        poses.push(pose);
    }

    let truth = CalibrationResult {
        camera_matrix: k,
        distortion_coeffs: dist,
        image_size: (args.width, args.height),
        poses,
        rms: 0.0,
        per_view_rms: Vec::new(),
    };
    write_camera_info(
        &args.output.join("ground_truth.yaml"),
        &CameraInfoRecord::from_calibration(&truth),
    )?;
    log::info!("Generated {} frames in {}", args.num_frames, args.output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    generate_dataset(&args)
}
