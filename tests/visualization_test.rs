use checkerboard_camera_calibration::visualization::{
    CONTACT_SHEET_COLUMNS, THUMB_WIDTH, contact_sheet, draw_corner_overlay, draw_index_label, row_color,
    side_by_side,
};
use glam::Vec2;
use image::{DynamicImage, Rgb, RgbImage};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

#[test]
fn test_contact_sheet_grid_dimensions() {
    let overlays: Vec<RgbImage> = (0..7).map(|_| RgbImage::new(640, 480)).collect();
    let sheet = contact_sheet(&overlays, CONTACT_SHEET_COLUMNS).unwrap();
    assert_eq!(CONTACT_SHEET_COLUMNS, 6);
    assert_eq!(sheet.dimensions(), (6 * THUMB_WIDTH, 2 * 240));
}

#[test]
fn test_contact_sheet_places_thumbnails() {
    let colors = [Rgb([200, 0, 0]), Rgb([0, 200, 0]), Rgb([0, 0, 200])];
    let overlays: Vec<RgbImage> = colors.iter().map(|c| RgbImage::from_pixel(160, 120, *c)).collect();
    let sheet = contact_sheet(&overlays, 6).unwrap();
    assert_eq!(sheet.dimensions(), (6 * THUMB_WIDTH, 240));
    assert_eq!(*sheet.get_pixel(10, 10), colors[0]);
    assert_eq!(*sheet.get_pixel(THUMB_WIDTH + 10, 100), colors[1]);
    assert_eq!(*sheet.get_pixel(2 * THUMB_WIDTH + 10, 200), colors[2]);
    // unused cells stay white
    assert_eq!(*sheet.get_pixel(5 * THUMB_WIDTH + 10, 10), Rgb([255, 255, 255]));
}

#[test]
fn test_contact_sheet_empty_is_none() {
    assert!(contact_sheet(&[], CONTACT_SHEET_COLUMNS).is_none());
}

#[test]
fn test_side_by_side_dimensions_and_halves() {
    let left = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 50, Rgb([10, 20, 30])));
    let right = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(80, 70, image::Luma([90])));
    let pair = side_by_side(&left, &right);
    assert_eq!(pair.dimensions(), (180, 70));
    assert_eq!(*pair.get_pixel(10, 10), Rgb([10, 20, 30]));
    assert_eq!(*pair.get_pixel(110, 60), Rgb([90, 90, 90]));
    assert_eq!(*pair.get_pixel(10, 60), BLACK);
}

#[test]
fn test_index_label_digits() {
    let red = Rgb([255, 0, 0]);
    let mut canvas = RgbImage::new(40, 20);
    draw_index_label(&mut canvas, 10, 0, 0, red);
    // "1": top row is the middle column only
    assert_eq!(*canvas.get_pixel(0, 0), BLACK);
    assert_eq!(*canvas.get_pixel(2, 0), red);
    assert_eq!(*canvas.get_pixel(3, 1), red);
    // "0" starts one glyph plus a gap later and is hollow in the middle
    assert_eq!(*canvas.get_pixel(8, 0), red);
    assert_eq!(*canvas.get_pixel(10, 2), BLACK);
    assert_eq!(*canvas.get_pixel(12, 2), red);
    // nothing below the five glyph rows
    assert!((0..40).all(|x| *canvas.get_pixel(x, 10) == BLACK));
}

#[test]
fn test_index_label_clips_at_border() {
    let mut canvas = RgbImage::new(8, 8);
    draw_index_label(&mut canvas, 123, 4, 4, Rgb([1, 2, 3]));
    draw_index_label(&mut canvas, 7, -20, -20, Rgb([1, 2, 3]));
    // top row of "1" is its middle column
    assert_eq!(*canvas.get_pixel(6, 4), Rgb([1, 2, 3]));
    assert_eq!(*canvas.get_pixel(4, 4), BLACK);
}

#[test]
fn test_overlay_numbers_each_corner() {
    let img = DynamicImage::ImageRgb8(RgbImage::new(120, 120));
    let corners = vec![
        Vec2::new(20.0, 20.0),
        Vec2::new(60.0, 20.0),
        Vec2::new(20.0, 70.0),
        Vec2::new(60.0, 70.0),
    ];
    let overlay = draw_corner_overlay(&img, &corners, 2, 2);
    assert_eq!(overlay.dimensions(), (120, 120));
    // labels start 4 px right of and below each corner, colored by board row
    assert_eq!(*overlay.get_pixel(24, 24), row_color(0, 2));
    assert_eq!(*overlay.get_pixel(66, 24), row_color(0, 2));
    assert_eq!(*overlay.get_pixel(24, 74), row_color(1, 2));
    assert_eq!(*overlay.get_pixel(64, 74), row_color(1, 2));
}

#[test]
fn test_row_color_spans_colormap() {
    assert_ne!(row_color(0, 6), row_color(5, 6));
    assert_eq!(row_color(0, 0), row_color(0, 6));
    assert_eq!(row_color(9, 6), row_color(5, 6));
}
