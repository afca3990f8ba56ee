mod catalog;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use rayon::prelude::*;
use serde::Serialize;
use ski_trip::format::{format_altitude, format_date, format_distance, format_duration, format_speed};
use ski_trip::profile::{activity_profile, altitude_profile};
use ski_trip::{
    analyze_trip, parse_trip_json, AnalysisConfig, TripAnalysis, DEFAULT_GPS_ACCURACY_THRESHOLD_M,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ski trip GPS log analysis CLI", long_about = None)]
struct Cli {
    /// Directory holding recorded `<id>.json` trip logs
    #[arg(
        long,
        global = true,
        env = "JSON_DATA_PATH",
        default_value = "./JSON",
        value_hint = ValueHint::DirPath
    )]
    data_dir: PathBuf,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List recorded trips, newest first
    List,
    /// Print a stored trip log with entry metadata
    Show(ShowArgs),
    /// Delete a stored trip log
    Delete(DeleteArgs),
    /// Analyze one or more trip logs (file paths or trip ids)
    Analyze(AnalyzeArgs),
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Trip id (file stem in the data directory)
    id: String,

    /// Pretty-print JSON output
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Parser, Debug)]
struct DeleteArgs {
    /// Trip id (file stem in the data directory)
    id: String,
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Trip log files, or ids of trips in the data directory
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    inputs: Vec<String>,

    /// Fixes with a horizontal accuracy above this many metres are dropped
    #[arg(
        long,
        env = "GPS_ACCURACY_THRESHOLD",
        default_value_t = DEFAULT_GPS_ACCURACY_THRESHOLD_M
    )]
    gps_accuracy_threshold: f64,

    /// Output JSON path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Also write every GPS point with its activity label to this CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    points_csv: Option<PathBuf>,

    /// Write a thinned altitude/speed profile with activity labels to this CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    profile_csv: Option<PathBuf>,

    /// Approximate number of samples per trip in the profile CSV
    #[arg(long, default_value_t = 200)]
    profile_samples: usize,

    /// Pretty-print JSON output
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Serialize, Debug)]
struct FileAnalysis {
    file: String,
    analysis: TripAnalysis,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::List => handle_list(&cli.data_dir),
        Command::Show(args) => handle_show(&cli.data_dir, args),
        Command::Delete(args) => handle_delete(&cli.data_dir, args),
        Command::Analyze(args) => handle_analyze(&cli.data_dir, args),
    }
}

fn handle_list(data_dir: &Path) -> Result<()> {
    let trips = catalog::list_trips(data_dir)?;
    info!("{} trips in {}", trips.len(), data_dir.display());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for trip in &trips {
        writeln!(out, "{}\t{}\t{}", trip.id, trip.date, trip.filename)?;
    }
    Ok(())
}

fn handle_show(data_dir: &Path, args: ShowArgs) -> Result<()> {
    let record = catalog::load_trip(data_dir, &args.id)?;
    debug!(
        "{}: {} entries, gps {}",
        record.id, record.metadata.total_entries, record.metadata.has_gps
    );
    write_json(&record, Path::new("-"), args.pretty)
}

fn handle_delete(data_dir: &Path, args: DeleteArgs) -> Result<()> {
    let removed = catalog::delete_trip(data_dir, &args.id)?;
    info!("Deleted trip {} ({})", args.id, removed.display());
    Ok(())
}

fn handle_analyze(data_dir: &Path, args: AnalyzeArgs) -> Result<()> {
    let config = analysis_config(&args)?;

    let t_analyze = Instant::now();
    let inputs: Vec<(usize, String)> = args.inputs.iter().cloned().enumerate().collect();
    let mut results: Vec<(usize, FileAnalysis)> = inputs
        .par_iter()
        .map(|(index, input)| -> Result<(usize, FileAnalysis)> {
            let analysis = analyze_input(data_dir, input, &config)?;
            Ok((
                *index,
                FileAnalysis {
                    file: input.clone(),
                    analysis,
                },
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    // Restore input ordering
    results.sort_by_key(|(index, _)| *index);
    let results: Vec<FileAnalysis> = results.into_iter().map(|(_, r)| r).collect();
    debug!(
        "Analyze stage: {:.1} ms ({} inputs)",
        t_analyze.elapsed().as_secs_f64() * 1000.0,
        results.len()
    );

    for result in &results {
        log_trip_summary(result);
    }

    if let Some(path) = args.points_csv.as_ref() {
        write_points_csv(&results, path)?;
        info!("Wrote points CSV to {}", path.display());
    }

    if let Some(path) = args.profile_csv.as_ref() {
        write_profile_csv(&results, args.profile_samples, path)?;
        info!("Wrote profile CSV to {}", path.display());
    }

    match results.as_slice() {
        [single] => write_json(&single.analysis, &args.output, args.pretty),
        _ => write_json(&results, &args.output, args.pretty),
    }
}

fn analysis_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let threshold = args.gps_accuracy_threshold;
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(anyhow!(
            "--gps-accuracy-threshold must be a non-negative number, got {threshold}"
        ));
    }
    Ok(AnalysisConfig {
        gps_accuracy_threshold_m: threshold,
    })
}

/// An input is a path when one exists on disk, otherwise a trip id.
fn analyze_input(data_dir: &Path, input: &str, config: &AnalysisConfig) -> Result<TripAnalysis> {
    let path = Path::new(input);
    if path.is_file() {
        let text =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        return parse_trip_json(&text, config)
            .with_context(|| format!("failed to parse {}", path.display()));
    }
    let record = catalog::load_trip(data_dir, input)
        .with_context(|| format!("{input} is neither a file nor a stored trip"))?;
    Ok(analyze_trip(&record.data, config))
}

fn log_trip_summary(result: &FileAnalysis) {
    let trip = &result.analysis.trip;
    let (Some(start), Some(max_point)) = (trip.start_point.as_ref(), trip.max_speed_point.as_ref())
    else {
        warn!("{}: no usable GPS points", result.file);
        return;
    };
    let metrics = &trip.metrics;
    info!(
        "{}: {} | {} over {} | top {} at {} | drop {} ({} to {})",
        result.file,
        format_date(start.timestamp),
        format_distance(metrics.total_distance),
        format_duration(metrics.duration),
        format_speed(metrics.max_speed),
        format_date(max_point.timestamp),
        format_altitude(metrics.vertical_drop),
        format_altitude(metrics.max_altitude),
        format_altitude(metrics.min_altitude),
    );
    let perf = &result.analysis.performance_metrics;
    let slope = &result.analysis.slope_analysis;
    info!(
        "{}: {} runs (longest {}), skiing {}, lift {}, stopped {}",
        result.file,
        slope.total_runs,
        format_distance(slope.longest_run),
        format_duration(perf.skiing_time),
        format_duration(perf.lift_time),
        format_duration(perf.stopped_time),
    );
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path, pretty: bool) -> Result<()> {
    let body = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    if path.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{body}")?;
        return Ok(());
    }
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    writeln!(file, "{body}").with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote analysis to {}", path.display());
    Ok(())
}

fn write_points_csv(results: &[FileAnalysis], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_point_rows(results, &mut writer)
}

fn write_point_rows<W: Write>(results: &[FileAnalysis], writer: &mut csv::Writer<W>) -> Result<()> {
    writer.write_record([
        "file",
        "timestamp",
        "lat",
        "lng",
        "altitude_m",
        "speed_mps",
        "accuracy_m",
        "course_deg",
        "activity",
    ])?;
    for result in results {
        let points = &result.analysis.trip.gps_points;
        for (point, activity) in points.iter().zip(activity_profile(points)) {
            writer.write_record([
                result.file.clone(),
                point.timestamp.to_string(),
                format!("{:.7}", point.lat),
                format!("{:.7}", point.lng),
                format!("{:.2}", point.altitude),
                format!("{:.3}", point.speed),
                format!("{:.1}", point.accuracy),
                format!("{:.1}", point.course),
                activity.as_str().to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn write_profile_csv(results: &[FileAnalysis], samples: usize, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_profile_rows(results, samples, &mut writer)
}

fn write_profile_rows<W: Write>(
    results: &[FileAnalysis],
    samples: usize,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record([
        "file",
        "index",
        "timestamp",
        "altitude_m",
        "speed_kmh",
        "activity",
    ])?;
    for result in results {
        for sample in altitude_profile(&result.analysis.trip.gps_points, samples) {
            writer.write_record([
                result.file.clone(),
                sample.index.to_string(),
                sample.timestamp.to_string(),
                format!("{:.2}", sample.altitude),
                format!("{:.1}", sample.speed_kmh),
                sample.activity.as_str().to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
