use std::fs;
use std::path::Path;

use camera_intrinsic_model::OpenCVModel5;
use checkerboard_camera_calibration::CalibError;
use checkerboard_camera_calibration::board::BoardSpec;
use checkerboard_camera_calibration::camera_model::opencv5_from_k_and_d;
use checkerboard_camera_calibration::data_loader::{
    common_image_size, detect_observations, list_images,
};
use checkerboard_camera_calibration::detector::{ChessboardDetector, SubPixParams};
use checkerboard_camera_calibration::io::read_camera_info;
use checkerboard_camera_calibration::pipeline::{CalibrationRun, run_calibration};
use checkerboard_camera_calibration::synthetic::{random_pose, render_board};
use checkerboard_camera_calibration::visualization::PreviewMode;
use image::GrayImage;
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn write_synthetic_dataset(root: &Path, board: &BoardSpec, camera: &OpenCVModel5<f64>, frames: usize) {
    let image_dir = root.join("Image");
    fs::create_dir_all(&image_dir).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for i in 0..frames {
        let pose = random_pose(&mut rng, board, 0.5, 0.35);
        render_board(camera, &pose, board)
            .save(image_dir.join(format!("{:06}.png", i)))
            .unwrap();
    }
}

fn headless_run(root: &Path, config_dir: &Path, board: BoardSpec) -> CalibrationRun {
    CalibrationRun {
        root: root.to_path_buf(),
        board,
        config_dir: config_dir.to_path_buf(),
        preview: PreviewMode::None,
        rrd_path: config_dir.join("unused.rrd"),
        report_path: None,
    }
}

#[test]
fn test_list_images_sorted_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let image_dir = dir.path().join("Image");
    fs::create_dir_all(&image_dir).unwrap();
    for name in ["b.png", "a.jpg", "c.txt", "0.png", "d.jpeg"] {
        fs::write(image_dir.join(name), b"").unwrap();
    }
    let paths = list_images(dir.path()).unwrap();
    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["0.png", "a.jpg", "b.png"]);
}

#[test]
fn test_no_images_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("Image")).unwrap();
    assert!(matches!(list_images(dir.path()), Err(CalibError::NoImagesFound(_))));
    assert!(matches!(
        list_images(&dir.path().join("missing")),
        Err(CalibError::NoImagesFound(_))
    ));
}

#[test]
fn test_no_detections_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("blank");
    let image_dir = root.join("Image");
    fs::create_dir_all(&image_dir).unwrap();
    for i in 0..3 {
        GrayImage::from_pixel(160, 120, image::Luma([200]))
            .save(image_dir.join(format!("{}.png", i)))
            .unwrap();
    }
    let config_dir = dir.path().join("configs");
    fs::create_dir_all(&config_dir).unwrap();

    let board = BoardSpec::from_rows_cols(6, 5, 150.0).unwrap();
    let run = headless_run(&root, &config_dir, board);
    let result = run_calibration(&run);
    assert!(matches!(result, Err(CalibError::NoObservations)));
    assert!(!run.output_path().exists());
    assert_eq!(fs::read_dir(&config_dir).unwrap().count(), 0);
}

#[test]
fn test_undecodable_image_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let image_dir = dir.path().join("Image");
    fs::create_dir_all(&image_dir).unwrap();
    fs::write(image_dir.join("broken.png"), b"not a png").unwrap();
    let paths = list_images(dir.path()).unwrap();
    let board = BoardSpec::from_rows_cols(6, 5, 150.0).unwrap();
    let result = detect_observations(
        &paths,
        &board,
        &ChessboardDetector::default(),
        &SubPixParams::default(),
    );
    assert!(matches!(result, Err(CalibError::Decode { .. })));
}

#[test]
fn test_blank_images_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let board = BoardSpec::from_rows_cols(6, 8, 30.0).unwrap();
    let k = na::Matrix3::new(300.0, 0.0, 160.0, 0.0, 300.0, 120.0, 0.0, 0.0, 1.0);
    let camera = opencv5_from_k_and_d(&k, &[0.0; 5], 320, 240);
    write_synthetic_dataset(dir.path(), &board, &camera, 2);
    GrayImage::from_pixel(320, 240, image::Luma([90]))
        .save(dir.path().join("Image").join("000001a.png"))
        .unwrap();

    let paths = list_images(dir.path()).unwrap();
    assert_eq!(paths.len(), 3);
    let (observations, outcomes) = detect_observations(
        &paths,
        &board,
        &ChessboardDetector::default(),
        &SubPixParams::default(),
    )
    .unwrap();
    assert_eq!(observations.len(), 2);
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_found());
    assert!(outcomes[1].is_found());
    assert!(!outcomes[2].is_found());
    for obs in &observations {
        assert_eq!(obs.p2ds.len(), obs.p3ds.len());
        assert_eq!(obs.img_w_h, (320, 240));
    }
    assert_eq!(common_image_size(&observations).unwrap(), (320, 240));
}

#[test]
fn test_mixed_image_sizes_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let board = BoardSpec::from_rows_cols(6, 8, 30.0).unwrap();
    let k_small = na::Matrix3::new(300.0, 0.0, 160.0, 0.0, 300.0, 120.0, 0.0, 0.0, 1.0);
    let k_large = na::Matrix3::new(400.0, 0.0, 200.0, 0.0, 400.0, 150.0, 0.0, 0.0, 1.0);
    let small = opencv5_from_k_and_d(&k_small, &[0.0; 5], 320, 240);
    let large = opencv5_from_k_and_d(&k_large, &[0.0; 5], 400, 300);
    let image_dir = dir.path().join("Image");
    fs::create_dir_all(&image_dir).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let pose = random_pose(&mut rng, &board, 0.5, 0.2);
    render_board(&small, &pose, &board).save(image_dir.join("a.png")).unwrap();
    render_board(&large, &pose, &board).save(image_dir.join("b.png")).unwrap();

    let paths = list_images(dir.path()).unwrap();
    let (observations, _) = detect_observations(
        &paths,
        &board,
        &ChessboardDetector::default(),
        &SubPixParams::default(),
    )
    .unwrap();
    assert_eq!(observations.len(), 2);
    assert!(matches!(
        common_image_size(&observations),
        Err(CalibError::ImageSizeMismatch { .. })
    ));
}

#[test]
fn test_end_to_end_calibration() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("synthetic_cam");
    let board = BoardSpec::from_rows_cols(6, 8, 30.0).unwrap();
    let k = na::Matrix3::new(300.0, 0.0, 160.0, 0.0, 300.0, 120.0, 0.0, 0.0, 1.0);
    let camera = opencv5_from_k_and_d(&k, &[-0.05, 0.0, 0.0, 0.0, 0.0], 320, 240);
    write_synthetic_dataset(&root, &board, &camera, 6);

    let config_dir = dir.path().join("configs");
    fs::create_dir_all(&config_dir).unwrap();
    let mut run = headless_run(&root, &config_dir, board);
    run.report_path = Some(dir.path().join("report.json"));

    let (path, result) = run_calibration(&run).expect("calibration should succeed");
    assert_eq!(path, config_dir.join("synthetic_cam.yaml"));
    assert!(result.rms < 0.5, "rms {}", result.rms);

    let record = read_camera_info(&path).unwrap();
    assert_eq!(record.image_width, 320);
    assert_eq!(record.image_height, 240);
    let fx = record.camera_matrix.data[0];
    let fy = record.camera_matrix.data[4];
    assert!((fx - 300.0).abs() < 6.0, "fx {}", fx);
    assert!((fy - 300.0).abs() < 6.0, "fy {}", fy);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["views"].as_array().unwrap().len(), 6);
    assert_eq!(report["image_width"], 320);
}

#[test]
fn test_saved_preview_matches_headless_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("preview_cam");
    let board = BoardSpec::from_rows_cols(6, 8, 30.0).unwrap();
    let k = na::Matrix3::new(300.0, 0.0, 160.0, 0.0, 300.0, 120.0, 0.0, 0.0, 1.0);
    let camera = opencv5_from_k_and_d(&k, &[-0.05, 0.0, 0.0, 0.0, 0.0], 320, 240);
    write_synthetic_dataset(&root, &board, &camera, 4);

    let headless_dir = dir.path().join("headless");
    let saved_dir = dir.path().join("saved");
    fs::create_dir_all(&headless_dir).unwrap();
    fs::create_dir_all(&saved_dir).unwrap();

    let (headless_path, headless) = run_calibration(&headless_run(&root, &headless_dir, board)).unwrap();
    let mut saved_run = headless_run(&root, &saved_dir, board);
    saved_run.preview = PreviewMode::Save;
    saved_run.rrd_path = dir.path().join("preview.rrd");
    let (saved_path, saved) = run_calibration(&saved_run).unwrap();

    assert!(saved_run.rrd_path.exists());
    assert!(!headless_dir.join("unused.rrd").exists());
    assert_eq!(
        fs::read_to_string(&headless_path).unwrap(),
        fs::read_to_string(&saved_path).unwrap()
    );
    assert_eq!(headless.image_size, saved.image_size);
    assert_eq!(headless.poses.len(), saved.poses.len());
    assert_eq!(headless.per_view_rms.len(), saved.per_view_rms.len());
    assert!((headless.camera_matrix - saved.camera_matrix).abs().max() < 1e-9);
    for (a, b) in headless.distortion_coeffs.iter().zip(&saved.distortion_coeffs) {
        assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
    }
    assert!((headless.rms - saved.rms).abs() < 1e-9);
}
