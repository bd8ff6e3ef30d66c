use chrono::Local;
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use scope_capture::config::{load_config_or_default, AppConfig};
use scope_capture::siglent::protocol;
use scope_capture::{
    CaptureOrchestrator, CaptureRequest, Channel, ConnectionConfig, InstrumentLink,
    SiglentClient,
};

/// Capture displayed waveforms from a Siglent SDS oscilloscope to CSV
#[derive(Parser, Debug)]
#[command(name = "scope-capture")]
#[command(about = "Capture calibrated oscilloscope waveforms to CSV", long_about = None)]
struct Args {
    /// Scope IP address (overrides config)
    #[arg(short, long, value_name = "HOST")]
    address: Option<String>,

    /// SCPI port (overrides config)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Comma-separated channel numbers, e.g. "1,3" (default: all displayed)
    #[arg(short, long, value_name = "LIST")]
    channels: Option<String>,

    /// Output CSV filename (default: scope_<timestamp>.csv)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Max number of rows in the CSV (evenly decimates if needed)
    #[arg(short = 'n', long, value_name = "ROWS")]
    max_points: Option<usize>,

    /// Path to configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn parse_channel_list(list: &str) -> Result<Vec<Channel>, Box<dyn std::error::Error>> {
    list.split(',')
        .map(|part| -> Result<Channel, Box<dyn std::error::Error>> {
            let index: u8 = part.trim().parse()?;
            Ok(Channel::new(index)?)
        })
        .collect()
}

fn requested_channels(
    args: &Args,
    config: &AppConfig,
) -> Result<Option<Vec<Channel>>, Box<dyn std::error::Error>> {
    if let Some(list) = &args.channels {
        return Ok(Some(parse_channel_list(list)?));
    }
    if !config.capture.channels.is_empty() {
        let channels = config
            .capture
            .channels
            .iter()
            .map(|&index| Channel::new(index))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(channels));
    }
    Ok(None)
}

fn default_output_path(config: &AppConfig) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(&config.capture.output_dir).join(format!("scope_{timestamp}.csv"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config_or_default(args.config.as_deref());

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.log_level.clone());
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let address = args.address.clone().unwrap_or_else(|| config.scope.host.clone());
    let port = args.port.unwrap_or(config.scope.port);

    let mut client = SiglentClient::builder()
        .address(&address)
        .port(port)
        .config(ConnectionConfig {
            connect_timeout: Duration::from_secs(config.scope.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.scope.read_timeout_secs),
            write_timeout: Duration::from_secs(config.scope.write_timeout_secs),
        })
        .build()?;

    info!("connected to: {}", client.identify()?);

    // Time base is shared across channels; log it up front like the scope's
    // own status line.
    let tdiv = protocol::parse_value(&client.query(protocol::TDIV)?)?;
    let sara = protocol::parse_value(&client.query(protocol::SARA)?)?;
    info!("time base: TDIV={tdiv:.3e} s, sample rate={sara:.3e} Sa/s");

    let request = CaptureRequest {
        channels: requested_channels(&args, &config)?,
        max_rows: args.max_points.or(config.capture.max_rows),
    };

    let mut orchestrator = CaptureOrchestrator::new(client);
    let table = orchestrator.capture(&request)?;

    let path = args.output.unwrap_or_else(|| default_output_path(&config));
    scope_capture::write_csv(&table, &path)?;

    Ok(())
}
