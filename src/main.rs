use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use thunderborg_drive::config::{Calibration, I2C_BUS, TELEOP_STEP_CM, TELEOP_STEP_DEG};
use thunderborg_drive::motor::{MotionController, ThunderborgDriver};
use thunderborg_drive::teleop::{self, TeleopSteps};

/// Drive a ThunderBorg-based robot with timed, open-loop moves
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// I2C bus device the board is attached to
    #[arg(short, long, default_value = I2C_BUS)]
    bus: PathBuf,

    /// JSON file with seconds_per_meter / seconds_per_spin
    #[arg(short, long)]
    calibration: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Interactive keyboard control (W/S/A/D, Q to quit)
    Teleop {
        #[arg(long, default_value_t = TELEOP_STEP_CM)]
        step_cm: u32,
        #[arg(long, default_value_t = TELEOP_STEP_DEG)]
        step_deg: f32,
    },
    /// Drive forward a distance in centimeters
    Forward { centimeters: u32 },
    /// Drive backward a distance in centimeters
    Backward { centimeters: u32 },
    /// Spin in place; negative degrees turn left
    Spin {
        #[arg(allow_hyphen_values = true)]
        degrees: f32,
    },
    /// Print the battery voltage
    Battery,
    /// Set the onboard LED color
    Led { red: u16, green: u16, blue: u16 },
    /// Check that a ThunderBorg answers on the bus
    Probe,
}

fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let calibration = match &args.calibration {
        Some(path) => {
            info!("Loading calibration from {}", path.display());
            Calibration::load(path)?
        }
        None => Calibration::default(),
    };

    let mut driver = ThunderborgDriver::on_bus(&args.bus);
    driver.initialize()?;

    match args.command {
        Cmd::Teleop { step_cm, step_deg } => {
            let steps = TeleopSteps {
                centimeters: step_cm,
                degrees: step_deg,
            };
            let mut motion = MotionController::new(&mut driver, calibration);
            teleop::run(&mut motion, steps)?;
        }
        Cmd::Forward { centimeters } => {
            MotionController::new(&mut driver, calibration).drive_forward(centimeters)?;
        }
        Cmd::Backward { centimeters } => {
            MotionController::new(&mut driver, calibration).drive_backward(centimeters)?;
        }
        Cmd::Spin { degrees } => {
            MotionController::new(&mut driver, calibration).perform_spin(degrees)?;
        }
        Cmd::Battery => {
            let voltage = driver.battery_voltage()?;
            println!("Battery: {:.2} V", voltage);
        }
        Cmd::Led { red, green, blue } => {
            driver.set_led_color(red, green, blue)?;
        }
        Cmd::Probe => {
            if driver.check_for_peripheral() {
                println!("ThunderBorg found");
            } else {
                return Err("ThunderBorg not found".into());
            }
        }
    }

    Ok(())
}
