// Keyboard teleop: W/S drive, A/D spin, Q quit
// Each key press runs one blocking timed move; keys pressed meanwhile queue up.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{error, info};

use crate::config::{TELEOP_STEP_CM, TELEOP_STEP_DEG};
use crate::motor::{MotionController, Transport};

/// What a single key press asks the robot to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TeleopAction {
    Forward(u32),
    Backward(u32),
    Spin(f32),
    Quit,
}

/// Step sizes for one key press
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleopSteps {
    pub centimeters: u32,
    pub degrees: f32,
}

impl Default for TeleopSteps {
    fn default() -> Self {
        Self {
            centimeters: TELEOP_STEP_CM,
            degrees: TELEOP_STEP_DEG,
        }
    }
}

impl TeleopSteps {
    /// Map a key to an action, `None` for keys that do nothing
    pub fn action_for(&self, code: KeyCode) -> Option<TeleopAction> {
        match code {
            KeyCode::Char('w') => Some(TeleopAction::Forward(self.centimeters)),
            KeyCode::Char('s') => Some(TeleopAction::Backward(self.centimeters)),
            KeyCode::Char('a') => Some(TeleopAction::Spin(-self.degrees)),
            KeyCode::Char('d') => Some(TeleopAction::Spin(self.degrees)),
            KeyCode::Char('q') | KeyCode::Esc => Some(TeleopAction::Quit),
            _ => None,
        }
    }
}

/// Run one action. Returns false once the loop should stop.
///
/// Move failures are logged and do not end the session.
pub fn apply<T: Transport>(motion: &mut MotionController<'_, T>, action: TeleopAction) -> bool {
    let result = match action {
        TeleopAction::Forward(cm) => motion.drive_forward(cm),
        TeleopAction::Backward(cm) => motion.drive_backward(cm),
        TeleopAction::Spin(deg) => motion.perform_spin(deg),
        TeleopAction::Quit => return false,
    };

    if let Err(e) = result {
        error!("Move failed: {}", e);
    }
    true
}

/// Interactive loop on the terminal; raw mode is restored on exit
pub fn run<T: Transport>(
    motion: &mut MotionController<'_, T>,
    steps: TeleopSteps,
) -> std::io::Result<()> {
    info!("Controls: W=forward, S=backward, A=spin left, D=spin right, Q=quit");
    info!(
        "Step: {} cm, {} degrees",
        steps.centimeters, steps.degrees
    );

    enable_raw_mode()?;
    let result = key_loop(motion, steps);
    disable_raw_mode()?;

    result
}

fn key_loop<T: Transport>(
    motion: &mut MotionController<'_, T>,
    steps: TeleopSteps,
) -> std::io::Result<()> {
    loop {
        if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
            if kind != KeyEventKind::Press {
                continue;
            }
            if let Some(action) = steps.action_for(code) {
                if !apply(motion, action) {
                    info!("Quitting teleop");
                    return Ok(());
                }
            }
        }
    }
}
