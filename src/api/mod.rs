pub mod config;
pub mod input;
pub mod output;
pub mod report;

use clap::Parser;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::{AugmentedTable, SchemaError, run_pipeline};
use config::{ConfigError, Settings};
use input::{InputFormat, LoadError, load_table};
use report::{ReportScope, report_lines};

#[derive(Parser, Debug)]
#[command(
    name = "eatr",
    about = "Effective tax rate building blocks (cost of capital, allowance NPVs, finance costs) per scenario"
)]
pub struct Cli {
    #[arg(help = "Input table: .json records or columns, or .toml with [[scenario]] tables")]
    input: PathBuf,
    #[arg(long, value_enum, help = "Input format, inferred from the file extension by default")]
    format: Option<InputFormat>,
    #[arg(short, long, help = "Write the augmented table here instead of stdout")]
    output: Option<PathBuf>,
    #[arg(long, value_enum, help = "Percentage summary for none, the first, or all scenarios")]
    report: Option<ReportScope>,
    #[arg(long, help = "Decimal places in the percentage summary")]
    decimals: Option<usize>,
    #[arg(long, help = "Pretty-print the JSON output")]
    pretty: bool,
    #[arg(long, help = "Settings file, defaults to ./eatr.toml when present")]
    config: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn resolve_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(report) = cli.report {
        settings.report = report;
    }
    if let Some(decimals) = cli.decimals {
        settings.decimals = decimals;
    }
    settings.pretty |= cli.pretty;
    settings.validate()?;
    Ok(settings)
}

pub fn process(cli: &Cli, settings: &Settings) -> Result<(AugmentedTable, String), AppError> {
    let format = match cli.format {
        Some(format) => format,
        None => InputFormat::from_path(&cli.input)?,
    };
    let table = load_table(&cli.input, format)?;
    log::info!(
        "loaded {} scenarios with {} columns from {}",
        table.len(),
        table.columns().len(),
        cli.input.display()
    );

    let augmented = run_pipeline(&table)?;
    let json = output::to_json(&augmented, settings.pretty)?;
    Ok((augmented, json))
}

pub fn run(cli: Cli) -> Result<(), AppError> {
    let settings = resolve_settings(&cli)?;
    let (augmented, json) = process(&cli, &settings)?;

    for line in report_lines(&augmented, settings.report, settings.decimals) {
        eprintln!("{line}");
    }

    match &cli.output {
        Some(path) => {
            fs::write(path, format!("{json}\n")).map_err(|source| AppError::Write {
                path: path.clone(),
                source,
            })?;
            log::info!("wrote augmented table to {}", path.display());
        }
        None => println!("{json}"),
    }

    let flagged = augmented.flagged_count();
    if flagged > 0 {
        log::warn!(
            "{flagged} of {} scenarios have unavailable metrics",
            augmented.rows.len()
        );
    } else {
        log::info!("all {} scenarios fully computed", augmented.rows.len());
    }
    Ok(())
}
