use std::path::PathBuf;
use std::process::ExitCode;

use checkerboard_camera_calibration::board::{BoardConfig, BoardSpec};
use checkerboard_camera_calibration::io::object_from_json;
use checkerboard_camera_calibration::pipeline::{CalibrationRun, run_calibration};
use checkerboard_camera_calibration::visualization::PreviewMode;
use clap::Parser;

#[derive(Parser)]
#[command(version, about, author)]
struct CCRSCli {
    /// dataset root, images are read from <root>/Image
    #[arg(long, default_value = "data")]
    root: PathBuf,

    /// checkerboard interior corners: rows cols
    #[arg(long, num_args = 2, value_names = ["ROWS", "COLS"], default_values_t = [6, 5])]
    checkerboard: Vec<usize>,

    /// square edge in millimetres
    #[arg(long = "square_size", default_value_t = 150.0, allow_negative_numbers = true)]
    square_size: f64,

    /// board config json, overrides --checkerboard and --square_size
    #[arg(long)]
    board_config: Option<PathBuf>,

    /// camera_info yaml is written here as <basename(root)>.yaml
    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,

    #[arg(long, value_enum, default_value = "save")]
    preview: PreviewMode,

    /// recording written when --preview save
    #[arg(long, default_value = "output.rrd")]
    rrd: PathBuf,

    /// optional json report
    #[arg(long)]
    report: Option<PathBuf>,
}

fn board_from_cli(cli: &CCRSCli) -> checkerboard_camera_calibration::Result<BoardSpec> {
    if let Some(path) = &cli.board_config {
        let board_config: BoardConfig = object_from_json(path)?;
        return BoardSpec::from_config(&board_config);
    }
    BoardSpec::from_rows_cols(cli.checkerboard[0], cli.checkerboard[1], cli.square_size)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CCRSCli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    let board = match board_from_cli(&cli) {
        Ok(board) => board,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::from(1);
        }
    };
    let run = CalibrationRun {
        root: cli.root,
        board,
        config_dir: cli.config_dir,
        preview: cli.preview,
        rrd_path: cli.rrd,
        report_path: cli.report,
    };
    match run_calibration(&run) {
        Ok((path, result)) => {
            log::info!("rms {:.5} px, camera_info at {}", result.rms, path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(1)
        }
    }
}
