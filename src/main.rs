use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use farechart::charts;
use farechart::data::{self, InputFormat};
use farechart::decode::{decode, CategoryMappings};
use farechart::parser::{parse_key_spec, KeyTemplate};
use farechart::{CategoryField, DashboardConfig, Field, Record};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "farechart")]
#[command(about = "Aggregate flight price predictions into dashboard chart data", long_about = None)]
struct Args {
    /// Records file (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Record encoding; guessed from the input extension when omitted
    #[arg(short, long, value_parser = ["json", "csv"])]
    format: Option<String>,

    /// JSON file of {field: {code: label}} decode tables
    #[arg(short, long)]
    mappings: Option<PathBuf>,

    /// JSON dashboard configuration (colors, mappings, options)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for sampled charts
    #[arg(long)]
    seed: Option<u64>,

    /// Skip decoding categorical codes
    #[arg(long)]
    raw: bool,

    #[command(subcommand)]
    chart: Chart,
}

#[derive(Subcommand, Debug)]
enum Chart {
    /// Actual vs predicted price by days left
    DaysLeft,
    /// Predicted price by days left, per model
    Performance,
    /// Average actual price by days left
    AveragePrice,
    /// Predicted price per route, per model
    Routes,
    /// Most and least expensive routes for one model
    TopRoutes {
        #[arg(long)]
        model: String,
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Airline x days left heatmap of one model's predictions
    Heatmap {
        #[arg(long)]
        model: String,
    },
    /// Source x destination heatmap of actual prices
    CityHeatmap,
    /// Prediction error distribution per model
    Errors {
        #[arg(short, long)]
        sample: Option<usize>,
    },
    /// Actual price distribution per category
    Distribution {
        #[arg(long, default_value = "airline")]
        by: CategoryField,
        #[arg(short, long)]
        sample: Option<usize>,
    },
    /// Duration vs actual price
    Scatter {
        #[arg(short, long)]
        sample: Option<usize>,
    },
    /// Prediction error statistics per model
    Summary,
    /// Mean of a value grouped by a key template
    Aggregate {
        /// Field name or template, e.g. '{source_city}-{destination_city}'
        #[arg(long)]
        key: String,
        #[arg(long)]
        value: Field,
        /// Split into one series per rendered key
        #[arg(long)]
        series: Option<String>,
    },
    /// Pivot a value into a row x column matrix
    Pivot {
        #[arg(long)]
        row: String,
        #[arg(long)]
        col: String,
        #[arg(long)]
        value: Field,
    },
}

fn read_input(args: &Args) -> Result<Vec<Record>> {
    let format = match (&args.format, &args.input) {
        (Some(format), _) => format.parse::<InputFormat>()?,
        (None, Some(path)) => InputFormat::from_path(path),
        (None, None) => InputFormat::Json,
    };

    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    data::read_records(reader, format).context("Failed to read records")
}

fn numeric(field: Field) -> Result<Field> {
    if field.is_numeric() {
        Ok(field)
    } else {
        Err(anyhow!("'{}' is not a numeric field", field))
    }
}

fn template(text: &str) -> Result<KeyTemplate> {
    parse_key_spec(text).with_context(|| format!("Invalid key '{}'", text))
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value).context("Failed to serialize chart data")?;
    writeln!(handle).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_path(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(path) = &args.mappings {
        config.mappings = CategoryMappings::from_path(path)?;
    }
    if args.seed.is_some() {
        config.options.seed = args.seed;
    }

    let records = read_input(&args)?;
    let records = if args.raw {
        records
    } else {
        decode(&records, &config.mappings)
    };
    info!(records = records.len(), "loaded records");

    let mut rng = match config.options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let colors = &config.colors;
    let options = &config.options;
    debug!(chart = ?args.chart, "building chart");

    match &args.chart {
        Chart::DaysLeft => emit(&charts::days_left_price_comparison(&records, colors)),
        Chart::Performance => emit(&charts::model_performance_over_time(&records, colors)),
        Chart::AveragePrice => emit(&charts::average_price_by_days_left(&records, colors)),
        Chart::Routes => emit(&charts::route_price_comparison(&records, colors)),
        Chart::TopRoutes { model, n } => {
            emit(&charts::top_routes(&records, model, n.unwrap_or(options.top_n)))
        }
        Chart::Heatmap { model } => emit(&charts::prediction_heatmap(&records, model)),
        Chart::CityHeatmap => emit(&charts::city_pair_heatmap(&records)),
        Chart::Errors { sample } => {
            let k = sample.unwrap_or(options.sample_size);
            emit(&charts::error_distribution(&records, colors, k, &mut rng))
        }
        Chart::Distribution { by, sample } => {
            let k = sample.unwrap_or(options.sample_size);
            emit(&charts::price_distribution(&records, *by, colors, k, &mut rng))
        }
        Chart::Scatter { sample } => {
            let k = sample.unwrap_or(options.sample_size);
            emit(&charts::duration_scatter(&records, k, &mut rng))
        }
        Chart::Summary => emit(&charts::error_summary(&records)),
        Chart::Aggregate { key, value, series } => {
            let key = template(key)?;
            let series = series.as_deref().map(template).transpose()?;
            let value = numeric(*value)?;
            emit(&charts::custom_series(&records, &key, value, series.as_ref(), colors))
        }
        Chart::Pivot { row, col, value } => {
            let (row, col) = (template(row)?, template(col)?);
            let value = numeric(*value)?;
            emit(&charts::custom_pivot(&records, &row, &col, value))
        }
    }
}
