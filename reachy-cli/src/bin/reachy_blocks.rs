use anyhow::Result;
use clap::{Parser, Subcommand};
use reachy_cli::{error::CliError, logging};
use reachy_controller::{
    blocks::ReachyBlocks,
    config::{ClientConfig, ConfigUpdate, SIMULATOR_TIMEOUT_MS},
    recorded_moves::{self, DANCES_DATASET},
    state_cache::StateField,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON or YAML client configuration
    #[arg(long, global = true)]
    config: Option<String>,

    /// Daemon API root, must be a loopback address
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per request timeout
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Use the longer simulator timeout
    #[arg(long, global = true)]
    simulator: bool,

    /// Sets the level of verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the daemon answers
    Status,
    WakeUp,
    Sleep,
    /// Turn the head to a preset direction (UP, DOWN_LEFT, CENTER, ...)
    Head {
        direction: String,
        #[arg(short, long, default_value_t = 1.0)]
        duration: f64,
    },
    /// Turn the head to custom angles in degrees
    #[command(allow_negative_numbers = true)]
    Look {
        #[arg(long, default_value_t = 0.0)]
        pitch: f64,
        #[arg(long, default_value_t = 0.0)]
        yaw: f64,
        #[arg(long, default_value_t = 0.0)]
        roll: f64,
        #[arg(short, long, default_value_t = 1.0)]
        duration: f64,
    },
    /// Move the antennas, angles in degrees
    #[command(allow_negative_numbers = true)]
    Antennas {
        left: f64,
        right: f64,
        #[arg(short, long, default_value_t = 1.0)]
        duration: f64,
    },
    #[command(allow_negative_numbers = true)]
    AntennasBoth {
        angle: f64,
        #[arg(short, long, default_value_t = 1.0)]
        duration: f64,
    },
    #[command(allow_negative_numbers = true)]
    BodyYaw {
        angle: f64,
        #[arg(short, long, default_value_t = 1.0)]
        duration: f64,
    },
    /// HEAD_NOD, HEAD_SHAKE, ANTENNA_WAVE or BODY_SWAY
    Preset {
        motion: String,
        #[arg(short, long, default_value_t = 1.0)]
        cycles: f64,
    },
    /// Play a recorded move, `dataset||move` or a dance name
    Play { selector: Option<String> },
    /// List recorded moves of a dataset
    Moves {
        #[arg(long, default_value = DANCES_DATASET)]
        dataset: String,
        /// Print the built in selectors instead of asking the daemon
        #[arg(long)]
        catalog: bool,
    },
    /// enabled, disabled or gravity_compensation
    MotorMode { mode: String },
    /// Print every cached state field
    State,
    /// Print the head orientation in degrees
    Pose,
    /// Stop every running movement
    Stop,
}

fn client_config(args: &Args) -> Result<ClientConfig, CliError> {
    let base = match &args.config {
        Some(path) => ClientConfig::load(path).map_err(|source| CliError::ConfigFile {
            path: path.clone(),
            source,
        })?,
        None => ClientConfig::default(),
    };
    let simulator_timeout = args.simulator.then_some(SIMULATOR_TIMEOUT_MS);
    let update = ConfigUpdate {
        base_url: args.base_url.clone(),
        timeout_ms: args.timeout_ms.or(simulator_timeout),
    };
    Ok(base.merged(&update)?)
}

async fn run(blocks: &mut ReachyBlocks, command: &Command) -> Result<()> {
    match command {
        Command::Status => {
            let connected = blocks.is_daemon_connected().await;
            println!("connected: {connected}");
        }
        Command::WakeUp => {
            let outcome = blocks.wake_up().await?;
            info!(?outcome, "Awake");
        }
        Command::Sleep => {
            let outcome = blocks.goto_sleep().await?;
            info!(?outcome, "Asleep");
        }
        Command::Head {
            direction,
            duration,
        } => {
            let outcome = blocks.move_head_direction(direction, *duration).await?;
            info!(?outcome, "Head moved");
        }
        Command::Look {
            pitch,
            yaw,
            roll,
            duration,
        } => {
            let outcome = blocks
                .move_head_custom(*pitch, *yaw, *roll, *duration)
                .await?;
            info!(?outcome, "Head moved");
        }
        Command::Antennas {
            left,
            right,
            duration,
        } => {
            let outcome = blocks.move_antennas(*left, *right, *duration).await?;
            info!(?outcome, "Antennas moved");
        }
        Command::AntennasBoth { angle, duration } => {
            let outcome = blocks.move_antennas_both(*angle, *duration).await?;
            info!(?outcome, "Antennas moved");
        }
        Command::BodyYaw { angle, duration } => {
            let outcome = blocks.move_body_yaw(*angle, *duration).await?;
            info!(?outcome, "Body moved");
        }
        Command::Preset { motion, cycles } => {
            blocks.perform_preset_motion(motion, *cycles).await?;
            info!(%motion, "Preset finished");
        }
        Command::Play { selector } => {
            let outcome = blocks
                .play_recorded_move_dataset(selector.as_deref().unwrap_or_default())
                .await?;
            info!(?outcome, "Recorded move finished");
        }
        Command::Moves { dataset, catalog } => {
            if *catalog {
                for selection in recorded_moves::catalog() {
                    println!("{}", selection.encode());
                }
            } else {
                for name in blocks.recorded_moves(dataset).await? {
                    println!("{name}");
                }
            }
        }
        Command::MotorMode { mode } => {
            blocks.set_motor_mode(mode).await?;
            info!(%mode, "Motor mode set");
        }
        Command::State => {
            let snapshot = blocks.refresh_state().await?;
            for field in StateField::ALL {
                println!("{}: {}", field.as_str(), snapshot.value(field));
            }
        }
        Command::Pose => {
            let pitch = blocks.head_pitch().await;
            let yaw = blocks.head_yaw().await;
            let roll = blocks.head_roll().await;
            println!("pitch: {pitch:.1} yaw: {yaw:.1} roll: {roll:.1}");
        }
        Command::Stop => {
            blocks.stop_movement().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_tracing(args.verbose, args.json_logs);

    let config = client_config(&args)?;
    info!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "Connecting to daemon");
    let mut blocks = ReachyBlocks::connect(config).map_err(CliError::from)?;

    let finished = tokio::select! {
        result = run(&mut blocks, &args.command) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match finished {
        Some(result) => result,
        None => {
            warn!("Detected Ctrl+c, stopping movement");
            blocks.stop_movement().await?;
            Err(CliError::Interrupted.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_angles_parse() {
        let args = Args::parse_from(["reachy_blocks", "antennas", "-30", "30", "-d", "2"]);
        assert!(matches!(
            args.command,
            Command::Antennas { left, right, duration } if left == -30.0 && right == 30.0 && duration == 2.0
        ));
    }

    #[test]
    fn simulator_flag_raises_timeout() {
        let args = Args::parse_from(["reachy_blocks", "--simulator", "status"]);
        assert_eq!(client_config(&args).unwrap().timeout_ms, SIMULATOR_TIMEOUT_MS);

        let args = Args::parse_from(["reachy_blocks", "--simulator", "--timeout-ms", "500", "stop"]);
        assert_eq!(client_config(&args).unwrap().timeout_ms, 500);
    }

    #[test]
    fn remote_base_url_is_rejected() {
        let args = Args::parse_from(["reachy_blocks", "--base-url", "http://10.0.0.2:8000/api", "status"]);
        assert!(matches!(client_config(&args), Err(CliError::InvalidConfig(_))));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from(["reachy_blocks", "preset", "HEAD_NOD", "-c", "2", "-vv"]);
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.command, Command::Preset { cycles, .. } if cycles == 2.0));
    }
}
