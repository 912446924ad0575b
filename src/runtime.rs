// Bus loop: commands in, status out
//
// Commands arrive on TOPIC_CMD and are applied in order through the session,
// which owns the motors. Status is published on every tick. Ctrl-C disengages
// any controller and stops the wheels before exit.

use std::sync::Arc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use crate::config::{RobotConfig, TOPIC_CMD, TOPIC_STATUS};
use crate::messages::{Command, StatusReport};
use crate::motor::{self, MotorDriver};
use crate::session::Session;
use crate::vision::PipelineFactory;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn run(config: RobotConfig, factory: Box<dyn PipelineFactory>) -> Result<(), BoxError> {
    info!("Connecting to Roomba on {} @ {} baud...", config.serial_port, config.baud_rate);
    let port = config.serial_port.clone();
    let baud = config.baud_rate;
    // Reset pulse plus boot wait blocks for a couple of seconds
    let driver = tokio::task::spawn_blocking(move || {
        let mut driver = MotorDriver::connect(&port, baud)?;
        driver.start()?;
        driver.safe_mode()?;
        Ok::<_, motor::MotorError>(driver)
    })
    .await??;
    info!("Roomba ready in safe mode");

    let driver = motor::shared(driver);
    let mut session = Session::new(Arc::clone(&driver), factory, config.detection, config.control);

    let result = serve(&mut session, &config).await;

    info!("Shutting down...");
    session.shutdown().await;
    if let Err(e) = driver.lock().stop() {
        warn!("Failed to stop wheels on shutdown: {}", e);
    }
    result
}

async fn serve(session: &mut Session, config: &RobotConfig) -> Result<(), BoxError> {
    info!("Opening Zenoh session...");
    let bus = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let subscriber = bus.declare_subscriber(TOPIC_CMD).await?;
    let pub_status = bus.declare_publisher(TOPIC_STATUS).await?;

    if let Some(mode) = config.autostart {
        match session.engage(mode, None).await {
            Ok(()) => info!("Autostarted {:?} controller", mode),
            Err(e) => warn!("Autostart failed: {}", e),
        }
    }

    let mut tick = interval(config.status_period());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Runtime started: {}Hz status", config.status_hz);
    info!("Subscribed to: {}", TOPIC_CMD);
    info!("Publishing to: {}", TOPIC_STATUS);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Ctrl-C received");
                return Ok(());
            }
            _ = tick.tick() => {}
        }

        // 1. Drain pending commands (non-blocking), apply in arrival order
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<Command>(&payload) {
                Ok(cmd) => {
                    info!("Received command: {:?}", cmd);
                    if let Err(e) = session.handle(cmd).await {
                        warn!("Command failed: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Failed to parse command: {}", e);
                }
            }
        }

        // 2. Publish status
        publish_status(&pub_status, &session.status()).await?;
    }
}

async fn publish_status(
    publisher: &zenoh::pubsub::Publisher<'_>,
    status: &StatusReport,
) -> Result<(), BoxError> {
    let json = serde_json::to_string(status)?;
    publisher.put(json).await?;
    Ok(())
}
