use std::{
    fs::OpenOptions,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ride_tracker::{
    configuration::Configuration,
    report::{format_statistics, statistics_json},
    session,
};
use ride_tracker_lib::ride_tracker::RideTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ride_tracker")]
#[command(about = "Track rides from GPS and motion sensor data", long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded NMEA log, optionally with recorded motion data
    Replay {
        #[arg(long)]
        nmea: PathBuf,
        /// CSV rows of ax,ay,az,gx,gy,gz[,temp]
        #[arg(long)]
        imu: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// GPX file to write, overrides the configuration
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Track from a serial GPS receiver until Ctrl-C. Motion is simulated as
    /// stationary unless --imu is given
    Live {
        #[arg(long)]
        port: String,
        #[arg(long, default_value_t = 9600)]
        baud: u32,
        #[arg(long)]
        imu: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Parse a single sentence and print the resulting fix
    Parse { sentence: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    match cli.command {
        Commands::Replay {
            nmea,
            imu,
            config,
            output,
            json,
        } => {
            let config = Configuration::load_or_default(config.as_deref())?;
            let stop = stop_on_ctrl_c()?;
            let tracker = session::replay(&nmea, imu.as_deref(), &config, &stop)?;
            finish(&tracker, output.or(config.output), json)?;
        },
        Commands::Live {
            port,
            baud,
            imu,
            config,
            output,
            json,
        } => {
            let config = Configuration::load_or_default(config.as_deref())?;
            let stop = stop_on_ctrl_c()?;
            let tracker = session::live(&port, baud, imu.as_deref(), &config, &stop)?;
            println!("Ride tracking stopped!");
            finish(&tracker, output.or(config.output), json)?;
        },
        Commands::Parse { sentence } => {
            let (kind, fix) = session::parse(&sentence)?;
            println!("{:?}", kind);
            println!("{}", serde_json::to_string_pretty(&fix)?);
        },
    }

    Ok(())
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,ride_tracker_lib=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

fn stop_on_ctrl_c() -> anyhow::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed))
        .context("Could not install Ctrl-C handler")?;
    Ok(stop)
}

fn finish(tracker: &RideTracker, output: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    if session::export(tracker, output.as_ref()) {
        if let Some(path) = &output {
            println!("Track '{}' exported to {}", tracker.track_name(), path.display());
        }
    }

    match tracker.statistics() {
        Some(stats) if json => println!("{}", statistics_json(&stats)?),
        Some(stats) => print!("{}", format_statistics(&stats)),
        None => println!("No points recorded"),
    }

    Ok(())
}
