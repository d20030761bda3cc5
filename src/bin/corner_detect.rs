use std::path::PathBuf;
use std::process::ExitCode;

use checkerboard_camera_calibration::data_loader::load_image;
use checkerboard_camera_calibration::get_corners;
use checkerboard_camera_calibration::visualization::{PreviewMode, create_recording, rerun_shift};
use clap::Parser;
use glam::Vec2;
use image::Rgb;
use imageproc::drawing::draw_filled_circle_mut;

/// Detect checkerboard corners in one image and mark them.
#[derive(Parser)]
#[command(version, about, author)]
struct CornerCli {
    /// input image
    image: PathBuf,

    #[arg(long, default_value_t = 8)]
    cols: usize,

    #[arg(long, default_value_t = 6)]
    rows: usize,

    /// annotated image output
    #[arg(long, default_value = "corners.png")]
    output: PathBuf,

    #[arg(long, value_enum, default_value = "none")]
    preview: PreviewMode,
}

fn run(cli: &CornerCli) -> checkerboard_camera_calibration::Result<usize> {
    let img = load_image(&cli.image)?;
    let gray = img.to_luma8();
    let corners = get_corners(&gray, cli.cols, cli.rows)?;
    log::info!("{} corners", corners.len());

    let mut color_img = img.to_rgb8();
    for pt in &corners {
        draw_filled_circle_mut(&mut color_img, (pt[0] as i32, pt[1] as i32), 1, Rgb([255, 0, 0]));
    }
    color_img.save(&cli.output)?;
    log::info!("annotated image saved to {}", cli.output.display());

    if let Some(recording) = create_recording(cli.preview, &PathBuf::from("corners.rrd"))? {
        let pts: Vec<Vec2> = corners.iter().map(|p| Vec2::new(p[0], p[1])).collect();
        let mut bytes: Vec<u8> = Vec::new();
        color_img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        recording.log("image", &rerun::EncodedImage::from_file_contents(bytes))?;
        recording.log(
            "image/corners",
            &rerun::Points2D::new(rerun_shift(&pts)).with_radii([rerun::Radius::new_ui_points(2.0)]),
        )?;
    }
    Ok(corners.len())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = CornerCli::parse();
    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(1)
        }
    }
}
