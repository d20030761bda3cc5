use std::io::Cursor;
use std::path::Path;

use glam::Vec2;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, imageops};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut,
};
use imageproc::rect::Rect;
use log::warn;
use rerun::RecordingStream;

use crate::camera_model::undistort_image;
use crate::data_loader::load_image;
use crate::detected_points::Observation;
use crate::error::Result;
use crate::types::CalibrationResult;

pub const CONTACT_SHEET_COLUMNS: usize = 6;
pub const THUMB_WIDTH: u32 = 320;
const LABEL_SCALE: u32 = 2;

/// 3x5 digit bitmaps, one byte per row, high bit on the left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Where preview output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PreviewMode {
    /// Headless, nothing is rendered.
    None,
    /// Write a `.rrd` recording.
    Save,
    /// Open a rerun viewer.
    Spawn,
}

pub fn create_recording(mode: PreviewMode, rrd_path: &Path) -> Result<Option<RecordingStream>> {
    let builder = rerun::RecordingStreamBuilder::new("checkerboard_calibration");
    let recording = match mode {
        PreviewMode::None => return Ok(None),
        PreviewMode::Save => builder.save(rrd_path)?,
        PreviewMode::Spawn => builder.spawn()?,
    };
    Ok(Some(recording))
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[Vec2]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|p| (p.x + 0.5, p.y + 0.5)).collect()
}

pub fn row_color(row: usize, rows: usize) -> Rgb<u8> {
    let t = row.min(rows.max(2) - 1) as f64 / (rows.max(2) - 1) as f64;
    let c = colorous::TURBO.eval_continuous(t);
    Rgb([c.r, c.g, c.b])
}

fn log_png(recording: &RecordingStream, entity: &str, img: &DynamicImage) {
    let mut bytes: Vec<u8> = Vec::new();
    if let Err(e) = img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png) {
        warn!("failed to encode {}: {}", entity, e);
        return;
    }
    if let Err(e) = recording.log(entity, &rerun::EncodedImage::from_file_contents(bytes)) {
        warn!("failed to log {}: {}", entity, e);
    }
}

/// Writes `index` in decimal with its top-left at `(x, y)`, clipped to the canvas.
pub fn draw_index_label(canvas: &mut RgbImage, index: usize, x: i32, y: i32, color: Rgb<u8>) {
    let s = LABEL_SCALE as i32;
    for (n, ch) in index.to_string().bytes().enumerate() {
        let glyph = DIGITS[(ch - b'0') as usize];
        let x0 = x + n as i32 * 4 * s;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) != 0 {
                    let cell = Rect::at(x0 + col * s, y + row as i32 * s).of_size(LABEL_SCALE, LABEL_SCALE);
                    draw_filled_rect_mut(canvas, cell, color);
                }
            }
        }
    }
}

/// Detected corners drawn on the image: row skeleton in per-row colors, index 0 ringed,
/// every corner numbered just below and right of its dot.
pub fn draw_corner_overlay(img: &DynamicImage, corners: &[Vec2], cols: usize, rows: usize) -> RgbImage {
    let mut canvas = img.to_rgb8();
    for (j, row) in corners.chunks(cols).enumerate() {
        let color = row_color(j, rows);
        for pair in row.windows(2) {
            draw_line_segment_mut(&mut canvas, (pair[0].x, pair[0].y), (pair[1].x, pair[1].y), color);
        }
        if let (Some(last), Some(next)) = (row.last(), corners.get((j + 1) * cols)) {
            draw_line_segment_mut(&mut canvas, (last.x, last.y), (next.x, next.y), color);
        }
        for p in row {
            draw_filled_circle_mut(&mut canvas, (p.x.round() as i32, p.y.round() as i32), 3, color);
        }
    }
    if let Some(first) = corners.first() {
        draw_hollow_circle_mut(
            &mut canvas,
            (first.x.round() as i32, first.y.round() as i32),
            8,
            Rgb([0, 255, 0]),
        );
    }
    for (idx, p) in corners.iter().enumerate() {
        let color = row_color(idx / cols.max(1), rows);
        draw_index_label(&mut canvas, idx, p.x.round() as i32 + 4, p.y.round() as i32 + 4, color);
    }
    canvas
}

/// Tiles overlays into a grid `columns` wide, each scaled to a common thumbnail size.
pub fn contact_sheet(overlays: &[RgbImage], columns: usize) -> Option<RgbImage> {
    let first = overlays.first()?;
    let columns = columns.max(1);
    let scale = THUMB_WIDTH as f32 / first.width().max(1) as f32;
    let tw = THUMB_WIDTH;
    let th = ((first.height() as f32 * scale).round() as u32).max(1);
    let grid_rows = overlays.len().div_ceil(columns);
    let mut sheet = RgbImage::from_pixel(tw * columns as u32, th * grid_rows as u32, Rgb([255, 255, 255]));
    for (idx, overlay) in overlays.iter().enumerate() {
        let thumb = imageops::resize(overlay, tw, th, imageops::FilterType::Triangle);
        let x = (idx % columns) as i64 * tw as i64;
        let y = (idx / columns) as i64 * th as i64;
        imageops::overlay(&mut sheet, &thumb, x, y);
    }
    Some(sheet)
}

/// Original and undistorted image side by side.
pub fn side_by_side(left: &DynamicImage, right: &DynamicImage) -> RgbImage {
    let (lw, lh) = left.dimensions();
    let (rw, rh) = right.dimensions();
    let mut canvas = RgbImage::new(lw + rw, lh.max(rh));
    imageops::overlay(&mut canvas, &left.to_rgb8(), 0, 0);
    imageops::overlay(&mut canvas, &right.to_rgb8(), lw as i64, 0);
    canvas
}

/// Per-image overlays with numbered corners, then the contact sheet of all of them.
pub fn log_detections(recording: &RecordingStream, observations: &[Observation], cols: usize, rows: usize) {
    let mut overlays = Vec::with_capacity(observations.len());
    for obs in observations {
        let img = match load_image(&obs.path) {
            Ok(img) => img,
            Err(e) => {
                warn!("preview skipped {}: {}", obs.path.display(), e);
                continue;
            }
        };
        recording.set_time("frame", rerun::TimeCell::from_sequence(obs.image_index as i64));
        let overlay = draw_corner_overlay(&img, &obs.p2ds, cols, rows);
        log_png(recording, "detections/image", &DynamicImage::ImageRgb8(overlay.clone()));

        let labels: Vec<String> = (0..obs.p2ds.len()).map(|i| i.to_string()).collect();
        let colors: Vec<rerun::Color> = (0..obs.p2ds.len())
            .map(|i| {
                let c = row_color(i / cols.max(1), rows);
                rerun::Color::from_rgb(c[0], c[1], c[2])
            })
            .collect();
        if let Err(e) = recording.log(
            "detections/image/corners",
            &rerun::Points2D::new(rerun_shift(&obs.p2ds))
                .with_colors(colors)
                .with_labels(labels)
                .with_radii([rerun::Radius::new_ui_points(3.0)]),
        ) {
            warn!("failed to log corners: {}", e);
        }
        overlays.push(overlay);
    }
    if let Some(sheet) = contact_sheet(&overlays, CONTACT_SHEET_COLUMNS) {
        recording.reset_time();
        log_png(recording, "detections/contact_sheet", &DynamicImage::ImageRgb8(sheet));
    }
}

/// Original | undistorted for the first `count` images.
pub fn log_undistortion(recording: &RecordingStream, img_paths: &[std::path::PathBuf], result: &CalibrationResult, count: usize) {
    let model = result.model();
    for (idx, path) in img_paths.iter().take(count).enumerate() {
        let img = match load_image(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("preview skipped {}: {}", path.display(), e);
                continue;
            }
        };
        let undistorted = undistort_image(&model, &result.camera_matrix, &img);
        let pair = side_by_side(&img, &undistorted);
        log_png(
            recording,
            &format!("undistortion/{}", idx + 1),
            &DynamicImage::ImageRgb8(pair),
        );
    }
}
