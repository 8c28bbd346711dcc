use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hexapod_runtime::config;
use hexapod_runtime::hw::mock::{MockImu, MockPower, MockPwm};
use hexapod_runtime::hw::ChipId;
use hexapod_runtime::messages::{ChipHealth, Command};
use hexapod_runtime::runtime::{Hardware, Runtime};

#[derive(Parser, Debug)]
#[command(about = "Hexapod 50 Hz control runtime")]
struct Args {
    /// Run against in-memory mock hardware instead of the robot.
    #[arg(long)]
    mock: bool,

    /// Calibration offsets file.
    #[arg(long, default_value = config::CALIBRATION_FILE)]
    calibration: PathBuf,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let hw = if args.mock {
        info!("mock hardware selected");
        Hardware {
            chip_a: Box::new(MockPwm::new(ChipId::A)),
            chip_b: Box::new(MockPwm::new(ChipId::B)),
            imu: Box::new(MockImu::level()),
            power: Box::new(MockPower::default()),
        }
    } else {
        // The register drivers sit on the hw::I2cTransport seam; wire a
        // bus implementation for the target board here.
        error!("no hardware transport compiled for this host, run with --mock");
        std::process::exit(1);
    };

    let (runtime, mut telemetry) = Runtime::new(hw, args.calibration);
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>(32);

    // Commands arrive as JSON lines on stdin, one per line.
    let stdin_task = tokio::spawn(async move {
        use tokio::io::{AsyncBufReadExt, BufReader};
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Command>(&line) {
                Ok(cmd) => {
                    if cmd_tx.send(cmd).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "unparseable command line"),
            }
        }
    });

    let telemetry_task = tokio::spawn(async move {
        while telemetry.changed().await.is_ok() {
            let snapshot = telemetry.borrow_and_update().clone();
            if snapshot.relaxed
                || snapshot.chip_a != ChipHealth::Ok
                || snapshot.chip_b != ChipHealth::Ok
            {
                info!(?snapshot.chip_a, ?snapshot.chip_b, relaxed = snapshot.relaxed, "health");
            }
        }
    });

    runtime.run(cmd_rx).await;
    stdin_task.abort();
    telemetry_task.abort();
}
