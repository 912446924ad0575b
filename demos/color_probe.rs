// Color probe: run the detector alone and print where the color is
//
// Usage: cargo run --features opencv --example color_probe -- [color] [camera]
// Example: cargo run --features opencv --example color_probe -- lime 0

use roomba_colorseek::vision::opencv::CameraFactory;
use roomba_colorseek::vision::{ColorPreset, DetectionConfig, Detector};
use std::time::Duration;
use tracing::info;

const PRINT_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut args = std::env::args().skip(1);
    let preset = args
        .next()
        .map(|name| ColorPreset::from_name_or_default(&name))
        .unwrap_or_default();
    let camera_id = match args.next() {
        Some(id) => id.parse()?,
        None => 0,
    };

    let config = DetectionConfig {
        range: preset.range(),
        camera_id,
        ..DetectionConfig::default()
    };

    let mut detector = Detector::open(config, &CameraFactory)?;
    detector.start();
    info!("Probing {} on camera {} (Ctrl-C to exit)", preset, camera_id);

    let mut tick = tokio::time::interval(PRINT_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tick.tick() => {
                let frame = detector
                    .display_frame()
                    .map(|f| format!("{}x{}", f.width, f.height))
                    .unwrap_or_else(|| "-".to_string());
                println!("Position: {:<10} display: {}", detector.position().to_string(), frame);
            }
        }
    }

    detector.close();
    Ok(())
}
