//! # ecam_trigger
//!
//! Command-line host for one trigger element: loads the controller TOML,
//! binds a motor, configures a time or position synchronization, optionally
//! fires it, and prints the computed table and the resulting status.
//!
//! ```text
//! ecam_trigger --config trigger.toml --motor 44 --start 0 --step 1 --repeats 3
//! ecam_trigger --config trigger.toml --simulate --time --fire -v
//! ```

use clap::Parser;
use ecam_common::config::{ConfigLoader, ControllerConfig, LogLevel};
use ecam_common::consts::{DEFAULT_CONFIG_PATH, SERVICE_NAME};
use ecam_link::default_registry;
use ecam_sync::{SynchronizationSpec, TriggerController, TriggerTable};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// ecam trigger/gate synchronization tool
#[derive(Parser, Debug)]
#[command(name = "ecam_trigger")]
#[command(version)]
#[command(about = "Configure and fire motion-controller trigger tables")]
struct Args {
    /// Controller configuration TOML.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Motor to bind (defaults to the first `[[motors]]` entry).
    #[arg(long, value_name = "ID")]
    motor: Option<u16>,

    /// Synchronize one pulse by time instead of by position.
    #[arg(long, conflicts_with_all = ["start", "step", "repeats"])]
    time: bool,

    /// First trigger position (user units).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    start: f64,

    /// Distance between triggers (user units, signed).
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    step: f64,

    /// Number of triggers.
    #[arg(long, default_value_t = 1)]
    repeats: u32,

    /// Load only the first trigger position.
    #[arg(long)]
    start_trigger_only: bool,

    /// Pre-arm and start after configuring.
    #[arg(long)]
    fire: bool,

    /// Use the simulated controller whatever the configured link driver.
    #[arg(long)]
    simulate: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);
    setup_tracing(&args, config.as_ref().ok().map(|c| c.shared.log_level));

    info!("{} v{} starting...", SERVICE_NAME, env!("CARGO_PKG_VERSION"));

    let result = config.and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<ControllerConfig, Box<dyn std::error::Error>> {
    let mut config = ControllerConfig::load(&args.config)
        .map_err(|e| format!("{}: {e}", args.config.display()))?;
    if args.simulate {
        config.link.driver = "simulation".to_string();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args, config: ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = default_registry();
    let mut controller = TriggerController::from_config(&config, &registry)?;
    if args.start_trigger_only {
        controller.set_start_trigger_only(true);
    }

    let motor = args
        .motor
        .or_else(|| config.motors.first().map(|m| m.axis))
        .ok_or("no motor given and no [[motors]] configured")?;
    controller.bind_motor(motor)?;

    let spec = if args.time {
        SynchronizationSpec::time()
    } else {
        SynchronizationSpec::position(args.start, args.step, args.repeats)
    };

    match controller.configure(&spec)? {
        TriggerTable::Pulse => println!("time pulse on motor {motor}"),
        TriggerTable::Positions(values) => {
            let text: Vec<String> = values.iter().map(f64::to_string).collect();
            println!("{} positions on motor {motor}: [{}]", values.len(), text.join(", "));
        }
    }

    if args.fire {
        controller.pre_arm()?;
        controller.start()?;
    }

    println!("{}", controller.status());
    Ok(())
}

fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let directive = if args.verbose {
        "debug"
    } else {
        configured.map_or("info", LogLevel::as_directive)
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
