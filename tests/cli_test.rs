use std::process::Command;

fn ccrs() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ccrs"));
    cmd.env("RUST_LOG", "error");
    cmd
}

#[test]
fn test_help_exits_zero() {
    let output = ccrs().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("--checkerboard"));
    assert!(text.contains("--square_size"));
}

#[test]
fn test_missing_images_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = ccrs()
        .args(["--root", dir.path().to_str().unwrap(), "--preview", "none"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_checkerboard_needs_two_values() {
    let output = ccrs().args(["--checkerboard", "6"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_non_positive_square_size_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for size in ["0", "-30"] {
        let output = ccrs()
            .args(["--root", dir.path().to_str().unwrap(), "--square_size", size, "--preview", "none"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1), "square_size {}", size);
    }
}

#[test]
fn test_board_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("board.json");
    std::fs::write(&config, r#"{"rows": 0, "cols": 5, "square_size_mm": 30.0}"#).unwrap();
    let output = ccrs()
        .args(["--root", dir.path().to_str().unwrap(), "--preview", "none", "--board-config"])
        .arg(&config)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid checkerboard"));
}
