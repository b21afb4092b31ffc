use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hydroseries_core::components::{self, CompletionParams};
use hydroseries_core::{parse_tests, HomogeneityOptions, LocalStorage, Priorize, TaskResult};

#[derive(Parser, Debug)]
#[command(author, version, about = "Hydrological series toolkit CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reshape a station/year/month matrix file into daily time series
    Reshape(ReshapeArgs),
    /// Complete a precipitation series by regression on nearby stations
    Complete(CompleteArgs),
    /// Complete paired max/min temperature series
    CompleteTemperature(CompleteTemperatureArgs),
    /// Extract per-station hydrologic-year statistics from a series file
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct IoArgs {
    /// Field delimiter of the input and output files
    #[arg(long, default_value = ";")]
    delimiter: String,
    /// Directory the output files are written into
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ReshapeArgs {
    /// Matrix spreadsheet exported as delimited text
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct CompleteArgs {
    /// Series file with a DATE column plus one column per station
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    params: ParamArgs,
    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct CompleteTemperatureArgs {
    /// Maximum-temperature series file
    #[arg(long)]
    max_input: PathBuf,
    /// Minimum-temperature series file
    #[arg(long)]
    min_input: PathBuf,
    #[command(flatten)]
    params: ParamArgs,
    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Series file with a DATE column plus one column per station
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct ParamArgs {
    /// First day of the completion range (YYYY-MM-DD)
    #[arg(long)]
    start_date: NaiveDate,
    /// Last day of the completion range, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end_date: NaiveDate,
    /// Station whose gaps are filled
    #[arg(long)]
    target_station: String,
    /// Stations used to reconstruct the target, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    analysis_stations: Vec<String>,
    /// Ranking criterion: r2, slope or pair
    #[arg(long, default_value = "r2")]
    priorize: String,
    /// Homogeneity tests to run, comma separated
    #[arg(long, value_delimiter = ',', default_value = "pettitt,snht,buishand")]
    tests: Vec<String>,
    /// Significance level for the homogeneity verdict
    #[arg(long, default_value_t = 0.5)]
    alpha: f64,
    /// Monte Carlo simulation count for the p-values
    #[arg(long, default_value_t = 10_000)]
    simulations: usize,
    /// Fix the Monte Carlo seed to make the report reproducible
    #[arg(long)]
    seed: Option<u64>,
}

impl ParamArgs {
    fn to_params(&self) -> Result<CompletionParams> {
        let priorize: Priorize = self.priorize.parse()?;
        let tests = parse_tests(&self.tests)?;
        Ok(CompletionParams {
            start_date: self.start_date,
            end_date: self.end_date,
            target_station: self.target_station.clone(),
            analysis_stations: self.analysis_stations.clone(),
            priorize,
            tests,
            homogeneity: HomogeneityOptions {
                alpha: self.alpha,
                simulations: self.simulations,
                seed: self.seed,
            },
        })
    }
}

fn delimiter_byte(delimiter: &str) -> Result<u8> {
    match delimiter.as_bytes() {
        [byte] => Ok(*byte),
        _ => bail!("delimiter must be a single byte, got '{delimiter}'"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    let result: TaskResult = match cli.command {
        Command::Reshape(args) => {
            let delimiter = delimiter_byte(&args.io.delimiter)?;
            let storage = LocalStorage::new(&args.io.out_dir);
            components::reshape_matrix_file(&args.input, delimiter, &storage)?
        }
        Command::Complete(args) => {
            let delimiter = delimiter_byte(&args.io.delimiter)?;
            let storage = LocalStorage::new(&args.io.out_dir);
            let params = args.params.to_params()?;
            components::complete_precipitation(&args.input, delimiter, &params, &storage)?
        }
        Command::CompleteTemperature(args) => {
            let delimiter = delimiter_byte(&args.io.delimiter)?;
            let storage = LocalStorage::new(&args.io.out_dir);
            let params = args.params.to_params()?;
            components::complete_temperature(
                &args.max_input,
                &args.min_input,
                delimiter,
                &params,
                &storage,
            )?
        }
        Command::Stats(args) => {
            let delimiter = delimiter_byte(&args.io.delimiter)?;
            let storage = LocalStorage::new(&args.io.out_dir);
            components::extract_statistics(&args.input, delimiter, &storage)?
        }
    };

    info!(files = result.files.len(), "task finished");
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
