//! CLI for accel-route.
//!
//! Runs the accelerator route transforms over a single event or a JSONL file of
//! events, the way the device cloud's route host would, and keeps running
//! routing statistics. Outcomes go to stdout, logs go to stderr.

use accel_route_core::{Bindings, Event, Outcome, Transform};
use accel_route_rules::Route;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ACCEL_ROUTE_LOG";
const DEFAULT_LOG_FILTER: &str = "accel_route=info,accel_route_rules=info";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available routes
    Routes,
    /// Transform a single event read from a file or stdin
    Transform {
        /// Route to run (see `routes`)
        #[arg(long)]
        route: String,

        /// Event JSON file; stdin when omitted
        #[arg(long)]
        event: Option<PathBuf>,

        #[command(flatten)]
        env: EnvArgs,
    },
    /// Transform every line of a JSONL file
    Batch {
        /// Route to run (see `routes`)
        #[arg(long)]
        route: String,

        /// Input file path
        #[arg(long)]
        path: PathBuf,

        #[command(flatten)]
        env: EnvArgs,

        /// Path to the stats file
        #[arg(long, default_value = "data/accel-route.stats.json")]
        stats_file: PathBuf,
    },
}

#[derive(Args)]
struct EnvArgs {
    /// JSON object of string bindings for the route
    #[arg(long)]
    bindings: Option<PathBuf>,

    /// Set a binding, overriding the bindings file (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,
}

impl EnvArgs {
    fn load(&self) -> Result<Bindings> {
        let mut env = match &self.bindings {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open bindings file {path:?}"))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("Bindings file {path:?} is not a flat object of strings"))?
            }
            None => Bindings::new(),
        };
        for raw in &self.set {
            let (key, value) = Bindings::parse_assignment(raw)?;
            env.insert(key, value);
        }
        Ok(env)
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct RouteStats {
    total_processed: u64,
    routed: u64,
    suppressed: u64,
    malformed: u64,
    by_route: HashMap<String, u64>,
    by_reason: HashMap<String, u64>,
    #[serde(with = "time::serde::iso8601")]
    last_updated: OffsetDateTime,
}

impl Default for RouteStats {
    fn default() -> Self {
        Self {
            total_processed: 0,
            routed: 0,
            suppressed: 0,
            malformed: 0,
            by_route: HashMap::new(),
            by_reason: HashMap::new(),
            last_updated: OffsetDateTime::now_utc(),
        }
    }
}

impl RouteStats {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path)?;
        let stats = serde_json::from_reader(file)?;
        Ok(stats)
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    fn update(&mut self, route: Route, outcome: &Outcome) {
        self.total_processed += 1;
        *self.by_route.entry(route.to_string()).or_insert(0) += 1;
        match outcome {
            Outcome::Route { .. } => self.routed += 1,
            Outcome::DoNotRoute { why } => {
                self.suppressed += 1;
                *self.by_reason.entry(why.clone()).or_insert(0) += 1;
            }
        }
        self.last_updated = OffsetDateTime::now_utc();
    }
}

fn parse_route(name: &str) -> Result<Route> {
    name.parse::<Route>()
        .with_context(|| format!("Available routes: {}", route_names().join(", ")))
}

fn route_names() -> Vec<String> {
    Route::ALL.iter().map(ToString::to_string).collect()
}

/// Resolves the route and its bindings; every configuration error surfaces here.
fn load_route(name: &str, env: &EnvArgs) -> Result<(Route, Bindings)> {
    let route = parse_route(name)?;
    let bindings = env.load()?;
    route
        .check_bindings(&bindings)
        .with_context(|| format!("Invalid bindings for route {route}"))?;
    Ok((route, bindings))
}

fn read_event(path: Option<&Path>) -> Result<Event> {
    let mut input = String::new();
    match path {
        Some(p) => {
            File::open(p)
                .with_context(|| format!("Failed to open event file {p:?}"))?
                .read_to_string(&mut input)?;
        }
        None => {
            io::stdin().read_to_string(&mut input)?;
        }
    }
    serde_json::from_str(&input).context("Event is not valid JSON")
}

/// Runs `route` over each non-blank line, writing one outcome per line.
///
/// Lines that are not JSON are logged, counted as malformed and skipped.
fn process_batch<R: BufRead, W: Write>(
    route: Route,
    env: &Bindings,
    reader: R,
    out: &mut W,
    stats: &mut RouteStats,
) -> Result<u64> {
    let mut processed = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = idx + 1, error = %e, "skipping malformed event");
                stats.malformed += 1;
                continue;
            }
        };
        let outcome = route
            .apply(&event, env)
            .with_context(|| format!("Route {route} failed on line {}", idx + 1))?;
        serde_json::to_writer(&mut *out, &outcome)?;
        writeln!(out)?;
        stats.update(route, &outcome);
        processed += 1;
    }
    Ok(processed)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Routes => {
            for name in route_names() {
                println!("{name}");
            }
        }
        Commands::Transform { route, event, env } => {
            let (route, bindings) = load_route(&route, &env)?;
            let event = read_event(event.as_deref())?;
            let outcome = route.apply(&event, &bindings)?;
            serde_json::to_writer_pretty(io::stdout(), &outcome)?;
            println!();
        }
        Commands::Batch {
            route,
            path,
            env,
            stats_file,
        } => {
            let (route, bindings) = load_route(&route, &env)?;
            let file = File::open(&path).context("Failed to open input file")?;

            let mut stats = RouteStats::load(&stats_file).unwrap_or_else(|e| {
                warn!(
                    "failed to read stats from {:?}; starting fresh: {}",
                    stats_file, e
                );
                RouteStats::default()
            });

            let stdout = io::stdout();
            let mut out = stdout.lock();
            let processed =
                process_batch(route, &bindings, BufReader::new(file), &mut out, &mut stats)?;
            out.flush()?;

            stats.last_updated = OffsetDateTime::now_utc();
            stats.save(&stats_file).context("Failed to save stats")?;
            info!(
                route = %route,
                processed,
                routed = stats.routed,
                suppressed = stats.suppressed,
                "batch complete"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("accel_route_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_process_batch_writes_one_outcome_per_event() {
        let input = concat!(
            r#"{"sn":"a","body":{"alert":"overcurrent","voltage":120,"current":5,"power":600}}"#,
            "\n\n",
            r#"{"sn":"b","body":{"voltage":118.6}}"#,
            "\n",
            "not json\n",
        );
        let mut out = Vec::new();
        let mut stats = RouteStats::default();

        let processed = process_batch(
            Route::PowerQuality,
            &Bindings::new(),
            input.as_bytes(),
            &mut out,
            &mut stats,
        )
        .unwrap();

        assert_eq!(processed, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Outcome = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(
            first.custom_message(),
            Some("Power alert from a: overcurrent. 120V, 5A, 600W.")
        );
        let second: Outcome = serde_json::from_str(lines[1]).unwrap();
        assert!(!second.is_routed());

        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.routed, 1);
        assert_eq!(stats.suppressed, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.by_route.get("power-quality"), Some(&2));
        assert_eq!(stats.by_reason.get("no power alert"), Some(&1));
    }

    #[test]
    fn test_process_batch_stops_on_route_error() {
        let mut env = Bindings::new();
        env.insert("vibration_max", "lots");
        let mut out = Vec::new();
        let mut stats = RouteStats::default();

        let res = process_batch(
            Route::MotorVibration,
            &env,
            r#"{"body":{"movements":"111"}}"#.as_bytes(),
            &mut out,
            &mut stats,
        );
        assert!(res.is_err());
        assert!(out.is_empty());
        assert_eq!(stats.total_processed, 0);
    }

    #[test]
    fn test_stats_roundtrip_through_file() {
        let dir = temp_dir("stats");
        let path = dir.join("nested").join("stats.json");

        let mut stats = RouteStats::default();
        stats.update(Route::AirQuality, &Outcome::do_not_route("no air-quality alert"));
        stats.save(&path).unwrap();

        let loaded = RouteStats::load(&path).unwrap();
        assert_eq!(loaded.total_processed, 1);
        assert_eq!(loaded.suppressed, 1);
        assert_eq!(loaded.by_route.get("air-quality"), Some(&1));

        let missing = RouteStats::load(&dir.join("missing.json")).unwrap();
        assert_eq!(missing.total_processed, 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_env_args_set_overrides_file() {
        let dir = temp_dir("bindings");
        let path = dir.join("env.json");
        std::fs::write(&path, r#"{"node_names":"1:Lab","vibration_min":"10"}"#).unwrap();

        let args = EnvArgs {
            bindings: Some(path),
            set: vec!["vibration_min=12".to_string()],
        };
        let env = args.load().unwrap();
        assert_eq!(env.get("node_names"), Some("1:Lab"));
        assert_eq!(env.get("vibration_min"), Some("12"));

        let bad = EnvArgs {
            bindings: None,
            set: vec!["oops".to_string()],
        };
        assert!(bad.load().is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_route_rejects_unknown_route_and_bad_bindings() {
        let none = EnvArgs {
            bindings: None,
            set: vec![],
        };
        let err = load_route("aqi", &none).unwrap_err();
        assert!(format!("{err:#}").contains("Unknown route: aqi"));

        let bad = EnvArgs {
            bindings: None,
            set: vec!["vibration_off=high".to_string()],
        };
        assert!(load_route("motor-vibration", &bad).is_err());
        assert!(load_route("power-quality", &bad).is_ok());
    }
}
