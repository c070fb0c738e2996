use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;

use healthrs::logging::init_logging;
use healthrs::{AppConfig, ExportFormat, HealthRsError, LogLevel, ReportKind, ReportOutput, ReportRunner};

/// healthrs - Apple Health export reports
///
/// Streams an `export.xml` once per report and writes VO2max, weight and
/// walking summaries as console tables and spreadsheet-ready sheets.
#[derive(Parser)]
#[command(name = "healthrs")]
#[command(version)]
#[command(about = "Reports from an Apple Health export", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Health export to read (default: export.xml)
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,

    /// Directory the sheets are written to
    #[arg(short, long, value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// Ignore entries before this day (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", global = true)]
    since: Option<NaiveDate>,

    /// Output formats, comma separated (csv, json, text)
    #[arg(short = 'f', long, value_delimiter = ',', global = true)]
    format: Vec<ExportFormat>,

    /// Print tables without writing any file
    #[arg(long, global = true)]
    console_only: bool,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors; no progress spinner
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// VO2max per day with trend
    Vo2max,

    /// VO2max joined with the most recent prior weight
    WeightVo2 {
        /// Days a weight measurement stays valid
        #[arg(long)]
        lookback_days: Option<u32>,
    },

    /// Walking workouts summed per ISO week
    WeeklyWalks,

    /// Daily walking distance including walking outside workouts
    DailyWalk,

    /// Weekly walking totals derived from daily totals
    WeeklyFromDaily {
        /// Read a daily walking sheet instead of scanning the export
        #[arg(long, value_name = "CSV")]
        daily: Option<PathBuf>,
    },

    /// Summary, splits and heart rate zones of the most recent walk
    LastWalk,

    /// Run every report; reports without data are skipped
    All,

    /// Manage the configuration file
    Config {
        /// Write a configuration file with default values
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            if let Some(error) = e.downcast_ref::<HealthRsError>() {
                tracing::debug!("{:?}", error);
                eprintln!("{} {}", "Error:".red().bold(), error.user_message());
                ExitCode::from(error.exit_code())
            } else {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::Config { init, show } = &cli.command {
        return manage_config(&cli, *init, *show);
    }

    let config = effective_config(&cli)?;
    init_logging(&config.logging)?;

    let runner = ReportRunner::new(config);
    match &cli.command {
        Commands::Vo2max => emit(&runner, runner.run(ReportKind::Vo2Max)?)?,
        Commands::WeightVo2 { .. } => emit(&runner, runner.run(ReportKind::WeightVo2)?)?,
        Commands::WeeklyWalks => emit(&runner, runner.run(ReportKind::WeeklyWalks)?)?,
        Commands::DailyWalk => emit(&runner, runner.run(ReportKind::DailyWalk)?)?,
        Commands::WeeklyFromDaily { daily: Some(path) } => {
            emit(&runner, runner.run_weekly_from_sheet(path)?)?
        }
        Commands::WeeklyFromDaily { daily: None } => {
            emit(&runner, runner.run(ReportKind::WeeklyFromDaily)?)?
        }
        Commands::LastWalk => emit(&runner, runner.run(ReportKind::LastWalk)?)?,
        Commands::All => return run_all(&runner),
        Commands::Config { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}

/// Config file values with command-line overrides applied
fn effective_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    if let Some(input) = &cli.input {
        config.input.export_path = input.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    if cli.since.is_some() {
        config.input.since = cli.since;
    }
    if !cli.format.is_empty() {
        config.output.formats = cli.format.clone();
    }
    if cli.console_only {
        config.output.formats.clear();
    }
    if let Commands::WeightVo2 {
        lookback_days: Some(days),
    } = cli.command
    {
        config.vo2max.lookback_days = days;
    }

    if cli.quiet {
        config.logging.level = LogLevel::Error;
        config.input.show_progress = false;
    } else {
        config.logging.level = LogLevel::from_verbosity(config.logging.level, cli.verbose);
    }

    config.validate()?;
    Ok(config)
}

fn manage_config(cli: &Cli, init: bool, show: bool) -> Result<ExitCode> {
    let path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);

    if init {
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        AppConfig::default().save_to_file(&path)?;
        println!("{} {}", "✓ Wrote default configuration to".green(), path.display());
    }

    if show || !init {
        let config = effective_config(cli)?;
        let rendered =
            toml::to_string_pretty(&config).context("Failed to serialize configuration to TOML")?;
        println!("{}", format!("# {}", path.display()).dimmed());
        println!("{}", rendered);
    }

    Ok(ExitCode::SUCCESS)
}

fn emit(runner: &ReportRunner, output: ReportOutput) -> Result<()> {
    let output_config = &runner.config().output;
    output.emit(
        &mut std::io::stdout().lock(),
        &output_config.directory,
        &output_config.formats,
    )?;
    Ok(())
}

/// Every report in turn; exit 1 if any failed, 2 if none had data
fn run_all(runner: &ReportRunner) -> Result<ExitCode> {
    let mut produced = 0;
    let mut failed = 0;

    for kind in ReportKind::ALL {
        let output_config = &runner.config().output;
        let result = runner.run(kind).and_then(|output| {
            output.emit(
                &mut std::io::stdout().lock(),
                &output_config.directory,
                &output_config.formats,
            )
        });

        match result {
            Ok(_) => produced += 1,
            Err(e) if e.is_no_data() => {
                println!("{} {}: {}", "Skipped".yellow().bold(), kind, e.user_message());
            }
            Err(HealthRsError::InputNotFound { path }) => {
                // No report can succeed without the export
                return Err(HealthRsError::InputNotFound { path }.into());
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", "Failed".red().bold(), kind, e.user_message());
            }
        }
    }

    println!(
        "{}",
        format!("{} of {} reports produced", produced, ReportKind::ALL.len()).bold()
    );
    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else if produced == 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}
