// Keyboard teleop: WASD drive, space stop, R/F speed, 1/2/3 engage seek/line/pursuit,
// C cycle color, Shift+D dock, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use roomba_colorseek::config::TOPIC_CMD;
use roomba_colorseek::control::Mode;
use roomba_colorseek::messages::{ColorSelection, Command, MacroCommand, MoveCommand};
use roomba_colorseek::vision::ColorPreset;

const SPEEDS: [i32; 3] = [80, 150, 300]; // mm/s
const INPUT_TIMEOUT_MS: u64 = 150; // Stop after this much time with no drive key held

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD).await?;

    info!("Controls: WASD=drive, SPACE=stop, R/F=speed, 1/2/3=seek/line/pursuit, C=color, Shift+D=dock, Q=quit");
    info!("Speed: MED");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn send(publisher: &zenoh::pubsub::Publisher<'_>, cmd: &Command) -> Result<(), BoxError> {
    publisher.put(serde_json::to_string(cmd)?).await?;
    Ok(())
}

async fn run_teleop(publisher: &zenoh::pubsub::Publisher<'_>) -> Result<(), BoxError> {
    let mut speed_idx: usize = 1;
    let mut color_idx: usize = ColorPreset::ALL
        .iter()
        .position(|p| *p == ColorPreset::default())
        .unwrap_or(0);

    // Only manual driving is refreshed by held keys; controllers run on their own
    let mut driving: Option<MoveCommand> = None;
    let mut last_movement_input = Instant::now();

    loop {
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                let mut command = None;
                match code {
                    KeyCode::Char('w') if pressed => driving = Some(MoveCommand::Forward),
                    KeyCode::Char('s') if pressed => driving = Some(MoveCommand::Backward),
                    KeyCode::Char('a') if pressed => driving = Some(MoveCommand::Left),
                    KeyCode::Char('d') if pressed => driving = Some(MoveCommand::Right),
                    KeyCode::Char(' ') if pressed => {
                        driving = None;
                        command = Some(Command::Stop);
                    }

                    KeyCode::Char('1') if pressed => command = Some(engage(Mode::Seek, color_idx)),
                    KeyCode::Char('2') if pressed => command = Some(engage(Mode::Line, color_idx)),
                    KeyCode::Char('3') if pressed => command = Some(engage(Mode::Pursuit, color_idx)),

                    KeyCode::Char('c') if pressed => {
                        color_idx = (color_idx + 1) % ColorPreset::ALL.len();
                        let preset = ColorPreset::ALL[color_idx];
                        info!("Color: {}", preset);
                        command = Some(Command::SetColor {
                            color: ColorSelection::Named(preset.name().to_string()),
                        });
                    }
                    KeyCode::Char('D') if pressed => {
                        command = Some(Command::Macro {
                            name: MacroCommand::Dock,
                        })
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(SPEEDS.len() - 1);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => {
                        send(publisher, &Command::Stop).await?;
                        break;
                    }

                    _ => {}
                }

                if matches!(code, KeyCode::Char('w' | 'a' | 's' | 'd')) && pressed {
                    last_movement_input = Instant::now();
                }
                if let Some(cmd) = command {
                    send(publisher, &cmd).await?;
                }
            }
        }

        let Some(direction) = driving else {
            continue;
        };

        // Key released: one explicit stop, then quiet until the next drive key
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            driving = None;
            send(publisher, &move_cmd(MoveCommand::Stop, speed_idx)).await?;
            continue;
        }

        send(publisher, &move_cmd(direction, speed_idx)).await?;
    }

    Ok(())
}

fn move_cmd(command: MoveCommand, speed_idx: usize) -> Command {
    Command::Move {
        command,
        speed: Some(SPEEDS[speed_idx]),
    }
}

fn engage(mode: Mode, color_idx: usize) -> Command {
    let preset = ColorPreset::ALL[color_idx];
    info!("Engaging {:?} on {}", mode, preset);
    Command::Seek {
        mode,
        color: Some(ColorSelection::Named(preset.name().to_string())),
    }
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
