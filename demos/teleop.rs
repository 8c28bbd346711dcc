// Keyboard teleop: WASD move, Z/X rotate, R/F speed, G gait, Q quit.
//
// Emits one JSON command per line on stdout; pipe into the runtime:
//   cargo run --example teleop | cargo run -- --mock

use std::io::Write;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};

use hexapod_runtime::gait::GaitPattern;
use hexapod_runtime::messages::{Command, MoveIntent};

const STEP_MM: f32 = 20.0;
const ROTATE_DEG: f32 = 10.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Controls: WASD=move, Z/X=rotate, R/F=speed, G=gait, space=stop, L=relax, O=resume, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop();
    disable_raw_mode()?;
    result
}

fn run_teleop() -> Result<(), Box<dyn std::error::Error>> {
    let mut speed: u8 = 5;
    let mut pattern = GaitPattern::Tripod;
    let mut intent = MoveIntent::default();
    let stdout = std::io::stdout();

    loop {
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press && kind != KeyEventKind::Repeat {
            continue;
        }

        let cmd = match code {
            KeyCode::Char('q') => break,
            KeyCode::Char('w') => {
                intent.y = STEP_MM;
                None
            }
            KeyCode::Char('s') => {
                intent.y = -STEP_MM;
                None
            }
            KeyCode::Char('a') => {
                intent.x = -STEP_MM;
                None
            }
            KeyCode::Char('d') => {
                intent.x = STEP_MM;
                None
            }
            KeyCode::Char('z') => {
                intent.rotate = ROTATE_DEG;
                None
            }
            KeyCode::Char('x') => {
                intent.rotate = -ROTATE_DEG;
                None
            }
            KeyCode::Char('r') => {
                speed = (speed + 1).min(10);
                eprintln!("speed: {speed}");
                None
            }
            KeyCode::Char('f') => {
                speed = speed.saturating_sub(1).max(2);
                eprintln!("speed: {speed}");
                None
            }
            KeyCode::Char('g') => {
                pattern = match pattern {
                    GaitPattern::Tripod => GaitPattern::Wave,
                    GaitPattern::Wave => GaitPattern::Tripod,
                };
                eprintln!("gait: {pattern:?}");
                None
            }
            KeyCode::Char(' ') => {
                intent = MoveIntent::default();
                Some(Command::Stop)
            }
            KeyCode::Char('l') => Some(Command::Relax),
            KeyCode::Char('o') => Some(Command::Resume),
            _ => continue,
        };

        let cmd = cmd.unwrap_or_else(|| {
            intent.speed = speed;
            intent.pattern = pattern;
            Command::Move(intent)
        });

        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &cmd)?;
        writeln!(out)?;
        out.flush()?;
    }

    Ok(())
}
