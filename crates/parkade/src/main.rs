use std::process;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use parkade::{Facility, FacilityView, Observer, Simulation, SimulationConfig};

const USAGE: &str = "Usage: parkade [--capacity <n>] [--vehicles <n>] [--lambda <rate>] \
                     [--seed <u64>] [--time-unit-ms <ms>] [--json]";

struct CliArgs {
    capacity: usize,
    vehicles: usize,
    lambda: f64,
    seed: Option<u64>,
    time_unit_ms: u64,
    json: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            capacity: 20,
            vehicles: 100,
            lambda: 0.5,
            seed: None,
            time_unit_ms: 1000,
            json: false,
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let cli = match parse_args(&args) {
        Ok(v) => v,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
                eprintln!();
            }
            eprintln!("{USAGE}");
            eprintln!();
            eprintln!("Options:");
            eprintln!("  --capacity <n>       Number of parking slots [default: 20]");
            eprintln!("  --vehicles <n>       Vehicles to simulate [default: 100]");
            eprintln!("  --lambda <rate>      Mean arrivals per time unit [default: 0.5]");
            eprintln!("  --seed <u64>         Seed for reproducible runs");
            eprintln!("  --time-unit-ms <ms>  Real length of one time unit [default: 1000]");
            eprintln!("  --json               Print the final report as JSON");
            process::exit(2);
        }
    };

    init_tracing();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Initialize tracing with PARKADE_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("PARKADE_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("parkade={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--capacity" | "--vehicles" | "--lambda" | "--seed" | "--time-unit-ms" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                match flag {
                    "--capacity" => cli.capacity = parse_value(flag, value)?,
                    "--vehicles" => cli.vehicles = parse_value(flag, value)?,
                    "--lambda" => cli.lambda = parse_value(flag, value)?,
                    "--seed" => cli.seed = Some(parse_value(flag, value)?),
                    _ => cli.time_unit_ms = parse_value(flag, value)?,
                }
            }
            "--json" => cli.json = true,
            "--help" | "-h" => return Err(String::new()),
            arg => return Err(format!("unexpected argument: {arg}")),
        }
        i += 1;
    }

    Ok(cli)
}

fn parse_value<T>(flag: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| format!("invalid {flag} '{value}': {e}"))
}

/// Prints one status line per visible change.
struct ConsoleObserver {
    last_line: Mutex<String>,
}

impl Observer for ConsoleObserver {
    fn on_change(&self, view: &FacilityView<'_>) {
        let bar: String = view
            .slots()
            .iter()
            .map(|s| if s.is_occupied() { '#' } else { '.' })
            .collect();
        let line = format!(
            "[{bar}] parked {}/{} | total {} | {}",
            view.parked(),
            view.capacity(),
            view.total_vehicles(),
            view.last_message().unwrap_or("-")
        );

        let Ok(mut last) = self.last_line.lock() else {
            return;
        };
        if *last != line {
            println!("{line}");
            *last = line;
        }
    }
}

fn run(cli: CliArgs) -> anyhow::Result<()> {
    let config = SimulationConfig::new(cli.vehicles, cli.lambda)
        .with_time_unit(Duration::from_millis(cli.time_unit_ms));
    let config = match cli.seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    };

    let facility = Facility::new(cli.capacity)?;
    let mut simulation = Simulation::new(config)?;

    if !cli.json {
        facility.add_observer(Arc::new(ConsoleObserver {
            last_line: Mutex::new(String::new()),
        }));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(simulation.run(&facility))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} vehicles parked and left in {:.1}s ({} needed a retry)",
            report.vehicles.len(),
            report.elapsed_ms as f64 / 1000.0,
            report.retried()
        );
    }

    Ok(())
}
