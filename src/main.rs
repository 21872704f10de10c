use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use clap::Parser;
use simplelog::{ConfigBuilder, WriteLogger};
use tripdeck::core::config::{self, CliOverrides, ResolvedConfig, SourceKind};
use tripdeck::core::controller::TripController;
use tripdeck::transit::providers::preferences;
use tripdeck::transit::{
    FilePreferences, HttpTransitSource, Preferences, StopType, TimetableSource, TransitSource,
};
use tripdeck::tui;

#[derive(Parser)]
#[command(name = "tripdeck", about = "Browse the upcoming trips of a transit stop")]
struct Args {
    /// Stop id to browse
    #[arg(short, long)]
    stop: Option<String>,

    /// Kind of stop
    #[arg(long, value_enum)]
    stop_type: Option<StopType>,

    /// Where trip data comes from
    #[arg(short, long, value_enum)]
    provider: Option<SourceKind>,

    /// Reference time (RFC 3339), defaults to now
    #[arg(long, value_parser = parse_reference)]
    at: Option<DateTime<FixedOffset>>,

    /// IANA time zone used for day boundaries
    #[arg(long)]
    time_zone: Option<String>,
}

fn parse_reference(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(raw).map_err(|e| format!("invalid RFC 3339 time '{raw}': {e}"))
}

fn build_source(config: &ResolvedConfig) -> io::Result<Arc<dyn TransitSource>> {
    match config.provider {
        SourceKind::Http => Ok(Arc::new(HttpTransitSource::new(
            config.http_base_url.clone(),
        ))),
        SourceKind::Timetable => {
            let source = TimetableSource::load(&config.timetable_path).map_err(|e| {
                io::Error::other(format!(
                    "cannot load timetable {}: {}",
                    config.timetable_path.display(),
                    e
                ))
            })?;
            Ok(Arc::new(source))
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let overrides = CliOverrides {
        provider: args.provider,
        stop_id: args.stop,
        stop_type: args.stop_type,
        time_zone: args.time_zone,
    };
    let resolved = config::load_config().and_then(|file| config::resolve(&file, &overrides));
    let resolved = match resolved {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("tripdeck: {e}");
            return Err(io::Error::other(e));
        }
    };

    // Initialize file logger - writes to tripdeck.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("tripdeck.log") {
        let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
    }

    log::info!(
        "tripdeck starting up: stop {} via {:?} in {}",
        resolved.stop,
        resolved.provider,
        resolved.time_zone
    );

    let source = build_source(&resolved)?;
    let preferences_path = preferences::default_path()
        .unwrap_or_else(|| PathBuf::from("tripdeck-preferences.json"));
    let preferences: Arc<dyn Preferences> = Arc::new(FilePreferences::open(preferences_path));

    let controller = TripController::start(
        resolved.stop.clone(),
        resolved.time_zone,
        source,
        preferences,
    );
    match args.at {
        Some(at) => controller.set_reference_date_time(at),
        None => controller.set_reference_date_time(chrono::Utc::now()),
    };

    tui::run(controller)
}
