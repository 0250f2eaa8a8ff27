//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use metrics_simulator::core::config::Config;
use metrics_simulator::core::errors::MsimError;
use metrics_simulator::daemon::run_loop::{RunArgs as LoopArgs, SimulatorRunner, StressSchedule};
use metrics_simulator::daemon::signals::SignalHandler;
use metrics_simulator::metrics::sample::{MetricField, MetricSample};
use metrics_simulator::metrics::views::{ViewShape, time_label};
use metrics_simulator::simulator::Simulator;
use metrics_simulator::simulator::status::StatusReport;

/// Metrics Simulator: synthetic server metrics in five chart-ready shapes.
#[derive(Debug, Parser)]
#[command(
    name = "msim",
    author,
    version,
    about = "Metrics Simulator - synthetic server metrics for dashboards",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the simulator and print one status line per poll.
    Run(RunArgs),
    /// Print one view transform of a freshly seeded window.
    View(ViewArgs),
    /// Print the freshly seeded history window.
    Snapshot(SnapshotArgs),
    /// List metric fields with their labels and colours.
    Fields,
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Overrides applied on top of the loaded config.
#[derive(Debug, Clone, Args, Default)]
struct WindowArgs {
    /// History capacity (samples in the window).
    #[arg(long, value_name = "N")]
    capacity: Option<usize>,
    /// RNG seed for reproducible output.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Stop after this many seconds (default: until Ctrl-C).
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,
    /// Enter stress mode this many seconds after start.
    #[arg(long, value_name = "SECS")]
    stress_after: Option<u64>,
    /// Leave stress mode after this many seconds of stress.
    #[arg(long, value_name = "SECS", requires = "stress_after")]
    stress_for: Option<u64>,
    /// Metric shown at the head of each status line.
    #[arg(long, value_name = "FIELD", default_value = "cpu_usage")]
    field: String,
    /// Milliseconds between status lines.
    #[arg(long, value_name = "MS", default_value_t = 1_000)]
    poll_ms: u64,
    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Debug, Clone, Args)]
struct ViewArgs {
    /// View shape: label-series, axis-series, point-list, xy-pairs, xy-named-pairs.
    #[arg(value_name = "SHAPE")]
    shape: String,
    /// Metric field to project.
    #[arg(long, value_name = "FIELD", default_value = "cpu_usage")]
    field: String,
    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Debug, Clone, Args)]
struct SnapshotArgs {
    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
    /// Show effective-vs-default config diff.
    Diff,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input: unknown field or shape, bad config.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<MsimError> for CliError {
    fn from(err: MsimError) -> Self {
        match err {
            MsimError::UnknownMetric { .. }
            | MsimError::UnknownView { .. }
            | MsimError::InvalidConfig { .. }
            | MsimError::MissingConfig { .. }
            | MsimError::ConfigParse { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_simulator(cli, args),
        Command::View(args) => run_view(cli, args),
        Command::Snapshot(args) => run_snapshot(cli, args),
        Command::Fields => run_fields(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli, window: &WindowArgs) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(capacity) = window.capacity {
        config.simulator.capacity = capacity;
    }
    if let Some(seed) = window.seed {
        config.simulator.seed = Some(seed);
    }
    config.validate()?;
    Ok(config)
}

// ──────────────────── run ────────────────────

fn run_simulator(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let field: MetricField = args.field.parse()?;
    if args.poll_ms == 0 {
        return Err(CliError::User("--poll-ms must be at least 1".to_string()));
    }
    let config = load_config(cli, &args.window)?;
    let mode = output_mode(cli);

    let source = config.paths.config_file.display().to_string();
    let signals = SignalHandler::new();
    let stopper = signals.clone();
    let mut runner = SimulatorRunner::init(&config, &source, signals)?;
    let loop_args = LoopArgs {
        duration: args.duration.map(Duration::from_secs),
        schedule: StressSchedule::new(
            args.stress_after.map(Duration::from_secs),
            args.stress_for.map(Duration::from_secs),
        ),
        poll_interval: Duration::from_millis(args.poll_ms),
    };

    let mut write_error = None;
    let summary = runner.run(&loop_args, |report| {
        if write_error.is_some() {
            return;
        }
        let result = match mode {
            OutputMode::Human => print_status_human(report, field),
            OutputMode::Json => serde_json::to_value(report)
                .map_err(CliError::from)
                .and_then(|value| {
                    write_json_line(&json!({ "command": "run", "status": value }))
                }),
        };
        if let Err(e) = result {
            // Closed stdout: end the run instead of ticking with no reader.
            write_error = Some(e);
            stopper.request_shutdown();
        }
    })?;
    runner.shutdown();
    if let Some(e) = write_error {
        return Err(e);
    }

    match mode {
        OutputMode::Human => {
            let ending = if summary.interrupted {
                "interrupted"
            } else {
                "finished"
            };
            println!(
                "{} after {}s: {} samples, {} stress ticks, {} payload prunes",
                ending.bold(),
                summary.elapsed_secs,
                summary.samples_generated,
                summary.stress_ticks,
                summary.payload_prunes,
            );
        }
        OutputMode::Json => {
            write_json_line(&json!({ "command": "run", "summary": summary }))?;
        }
    }
    Ok(())
}

fn print_status_human(report: &StatusReport, field: MetricField) -> Result<(), CliError> {
    let head = report.latest.map_or_else(
        || format!("{:>8}  {}: -", "--:--:--", field.label()),
        |s| {
            format!(
                "{:>8}  {}: {:.1}",
                time_label(s.timestamp),
                field.label(),
                s.value(field)
            )
        },
    );
    let line = report.summary_line();
    let line = if report.stressed {
        line.red().to_string()
    } else {
        line.normal().to_string()
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}  {line}", head.bold())?;
    Ok(())
}

// ──────────────────── view / snapshot ────────────────────

fn run_view(cli: &Cli, args: &ViewArgs) -> Result<(), CliError> {
    // Validate names before doing any work.
    let shape: ViewShape = args.shape.parse()?;
    let field: MetricField = args.field.parse()?;
    let config = load_config(cli, &args.window)?;
    let simulator = Simulator::new(&config)?;
    let view = simulator.view(shape, field);

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "view",
                "shape": shape.name(),
                "field": field.name(),
                "view": view,
            }))?;
        }
    }
    Ok(())
}

fn run_snapshot(cli: &Cli, args: &SnapshotArgs) -> Result<(), CliError> {
    let config = load_config(cli, &args.window)?;
    let simulator = Simulator::new(&config)?;
    let samples = simulator.snapshot();

    match output_mode(cli) {
        OutputMode::Human => print_samples_human(&samples),
        OutputMode::Json => {
            write_json_line(&json!({
                "command": "snapshot",
                "capacity": simulator.capacity(),
                "samples": samples,
            }))?;
        }
    }
    Ok(())
}

fn print_samples_human(samples: &[MetricSample]) {
    println!(
        "{:>8}  {:>6}  {:>6}  {:>6}  {:>8}  {:>8}  {:>6}  {:>7}",
        "time".bold(),
        "cpu%".bold(),
        "mem%".bold(),
        "disk%".bold(),
        "net in".bold(),
        "net out".bold(),
        "conns".bold(),
        "rt ms".bold(),
    );
    for s in samples {
        println!(
            "{:>8}  {:>6.1}  {:>6.1}  {:>6.1}  {:>8.1}  {:>8.1}  {:>6.0}  {:>7.1}",
            time_label(s.timestamp),
            s.cpu_usage,
            s.memory_usage,
            s.disk_usage,
            s.network_in,
            s.network_out,
            s.active_connections,
            s.response_time,
        );
    }
}

fn run_fields(cli: &Cli) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            for field in MetricField::ALL {
                println!(
                    "{:<20} {:<26} {}",
                    field.name().bold(),
                    field.label(),
                    field.color(1.0).dimmed()
                );
            }
        }
        OutputMode::Json => {
            let fields: Vec<Value> = MetricField::ALL
                .iter()
                .map(|f| {
                    json!({
                        "name": f.name(),
                        "label": f.label(),
                        "color": f.color(1.0),
                        "percentage": f.is_percentage(),
                    })
                })
                .collect();
            write_json_line(&json!({ "command": "fields", "fields": fields }))?;
        }
    }
    Ok(())
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("{}", "Configuration is valid.".green());
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        }))?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("{} {e}", "Configuration is INVALID:".red());
                    }
                    OutputMode::Json => {
                        write_json_line(&json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        }))?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
        Some(ConfigCommand::Diff) => {
            let effective = Config::load(cli.config.as_deref())?;
            // The resolved file path always differs from the default; compare the rest.
            let mut defaults = Config::default();
            defaults.paths.config_file.clone_from(&effective.paths.config_file);
            let eff_json = serde_json::to_value(&effective)?;
            let def_json = serde_json::to_value(&defaults)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    if effective == defaults {
                        println!("No differences from defaults.");
                    } else {
                        println!("--- defaults");
                        println!("+++ effective ({})", effective.paths.config_file.display());
                        println!();
                        print_json_diff("", &def_json, &eff_json);
                    }
                }
                OutputMode::Json => {
                    write_json_line(&json!({
                        "command": "config diff",
                        "has_differences": effective != defaults,
                        "effective": eff_json,
                        "defaults": def_json,
                    }))?;
                }
            }
            Ok(())
        }
    }
}

fn print_json_diff(prefix: &str, default: &Value, effective: &Value) {
    match (default, effective) {
        (Value::Object(d), Value::Object(e)) => {
            for (key, e_val) in e {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match d.get(key) {
                    Some(d_val) => print_json_diff(&path, d_val, e_val),
                    None => println!("{} {path} = {e_val}", "+".green()),
                }
            }
        }
        _ if default != effective => {
            println!("{} {prefix} = {default}", "-".red());
            println!("{} {prefix} = {effective}", "+".green());
        }
        _ => {}
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("MSIM_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
