use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roomba_colorseek::config::RobotConfig;
use roomba_colorseek::control::Mode;
use roomba_colorseek::vision::{self, ColorPreset};

/// Drive a Roomba toward (or along) a colored target seen by a camera
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Serial port of the Roomba SCI (e.g. /dev/ttyUSB0)
    port: Option<String>,

    /// JSON config file; CLI flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    baud: Option<u32>,

    /// Camera index
    #[arg(long)]
    camera: Option<i32>,

    /// Color preset to track (red, blue, yellow, black, lime, green)
    #[arg(long)]
    color: Option<ColorPreset>,

    /// Engage a controller right after startup
    #[arg(long, value_enum)]
    autostart: Option<Mode>,
}

fn list_ports() {
    eprintln!("No serial port given. Available ports:");
    match serialport::available_ports() {
        Ok(ports) if ports.is_empty() => eprintln!("  (none found)"),
        Ok(ports) => {
            for port in ports {
                eprintln!("  {}", port.port_name);
            }
        }
        Err(e) => eprintln!("  failed to enumerate ports: {}", e),
    }
}

fn build_config(args: Args) -> Result<RobotConfig, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &args.config {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };
    if let Some(port) = args.port {
        config.serial_port = port;
    }
    if let Some(baud) = args.baud {
        config.baud_rate = baud;
    }
    if let Some(camera) = args.camera {
        config.detection.camera_id = camera;
    }
    if let Some(color) = args.color {
        config.detection.range = color.range();
    }
    if args.autostart.is_some() {
        config.autostart = args.autostart;
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.port.is_none() && args.config.is_none() {
        list_ports();
        std::process::exit(1);
    }

    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };
    info!("Tracking {:?} - {:?}", config.detection.range.lower, config.detection.range.upper);

    if let Err(e) = roomba_colorseek::runtime::run(config, vision::camera_factory()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
