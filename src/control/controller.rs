// Sampling scaffold shared by every policy
//
// Owns the detector, samples its latest position on a fixed tick and hands
// the policy's decisions to the motor driver. Stopping is cooperative: the
// flag is checked once per tick, and `stop` waits for the loop to exit
// before sending the final Drive(0, 0).

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use super::policy::SteeringPolicy;
use crate::latest::Latest;
use crate::motor::{DriveCommand, SharedDriver};
use crate::vision::{ColorRange, Detector, DisplayFrame, Position};

const MIN_TICK: Duration = Duration::from_millis(1);

pub struct Controller<P: SteeringPolicy> {
    name: &'static str,
    tick: Duration,
    detector: Detector,
    driver: SharedDriver,
    policy: Arc<Mutex<P>>,
    stop_flag: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl<P: SteeringPolicy> Controller<P> {
    pub fn new(
        name: &'static str,
        policy: P,
        tick: Duration,
        detector: Detector,
        driver: SharedDriver,
    ) -> Self {
        Self {
            name,
            tick: tick.max(MIN_TICK),
            detector,
            driver,
            policy: Arc::new(Mutex::new(policy)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Start the detector, send the policy's initial command and launch the
    /// sampling loop. No-op if already running. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        self.detector.start();
        self.stop_flag.store(false, Ordering::Release);

        let initial = self.policy.lock().begin(Instant::now());
        if let Some(command) = initial {
            issue(&self.driver, command);
        }

        self.task = Some(tokio::spawn(sampling_loop(
            self.name,
            self.tick,
            self.detector.position_feed(),
            Arc::clone(&self.policy),
            Arc::clone(&self.driver),
            Arc::clone(&self.stop_flag),
        )));

        info!(
            "{} controller started: {}ms tick",
            self.name,
            self.tick.as_millis()
        );
    }

    /// Halt the loop (waiting for it to exit), stop the detector, stop the motors.
    /// Returns within about one tick. No-op if not running.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        self.stop_flag.store(true, Ordering::Release);
        if let Err(e) = task.await {
            error!("{} sampling loop ended abnormally: {}", self.name, e);
        }

        self.detector.stop_async().await;
        issue(&self.driver, DriveCommand::STOP);
        self.policy.lock().halt();
        info!("{} controller stopped", self.name);
    }

    /// Stop, then release the detector's camera
    pub async fn close(&mut self) {
        self.stop().await;
        self.detector.close();
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn state(&self) -> P::State {
        self.policy.lock().state()
    }

    pub fn position(&self) -> Position {
        self.detector.position()
    }

    pub fn display_frame(&self) -> Option<Arc<DisplayFrame>> {
        self.detector.display_frame()
    }

    pub fn set_color_range(&self, range: ColorRange) {
        self.detector.set_color_range(range);
    }
}

impl<P: SteeringPolicy> Drop for Controller<P> {
    fn drop(&mut self) {
        // Can't await here; the loop exits on its next tick
        if self.task.is_some() {
            warn!("{} controller dropped while running", self.name);
            self.stop_flag.store(true, Ordering::Release);
        }
    }
}

/// Send a drive command, logging failures. The next tick retries.
fn issue(driver: &SharedDriver, command: DriveCommand) {
    if let Err(e) = driver.lock().send_drive(command) {
        warn!("Error controlling motors: {}", e);
    }
}

async fn sampling_loop<P: SteeringPolicy>(
    name: &'static str,
    tick: Duration,
    position: Latest<Position>,
    policy: Arc<Mutex<P>>,
    driver: SharedDriver,
    stop: Arc<AtomicBool>,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if stop.load(Ordering::Acquire) {
            break;
        }

        let sampled = position.get();
        let command = policy.lock().on_tick(sampled, Instant::now());
        if let Some(command) = command {
            issue(&driver, command);
        }
    }

    debug!("{} sampling loop exited", name);
}
