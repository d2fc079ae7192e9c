use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod collect;
mod config;
mod error;
mod export;
mod factors;
mod fetch;
mod listing;
mod normalize;
mod table;
mod types;

use config::{Config, FIRST_YEAR, LAST_YEAR};
use export::file_link;
use factors::FactorBuilder;
use fetch::HttpClient;
use types::{ListingRecord, YearFactors};

#[derive(Parser)]
#[command(name = "gross-equivalent")]
#[command(about = "Sci-fi box office scraper with CPI-adjusted gross")]
struct Cli {
    /// CONL config file (default: gross-equivalent.conl if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Log every request and skipped field
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the listing pages into a CSV file
    Movies {
        /// Output CSV file (default: <data_dir>/movies.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build the CPI year factors for a range of years
    Factors {
        #[arg(long, default_value_t = FIRST_YEAR)]
        first: i32,
        #[arg(long, default_value_t = LAST_YEAR)]
        last: i32,
        /// Output JSON file (default: <data_dir>/year_factors.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scrape, build factors for the release years found and write the adjusted dataset
    Run {
        /// Output CSV file (default: <data_dir>/scifimovies_dataset.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output JSON file for the factors (default: <data_dir>/year_factors.json)
        #[arg(long)]
        factors_output: Option<PathBuf>,
    },
    /// Remove the data directory and the response cache
    Clean,
}

fn init_logging(quiet: bool, verbose: bool) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn scrape_movies(client: &HttpClient, config: &Config) -> Vec<ListingRecord> {
    tracing::info!(url = %config.listing_url, "collecting listing pages");
    collect::collect(client, &config.listing_url)
}

fn write_factors_file(path: &Path, factors: &YearFactors) -> Result<()> {
    export::write_factors(export::create_file(path)?, factors)
        .with_context(|| format!("Failed to write factors: {}", path.display()))
}

fn run_movies(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.data_dir.join("movies.csv"));
    let client = HttpClient::new(config)?;

    let records = scrape_movies(&client, config);
    if records.is_empty() {
        bail!("No listing records collected from {}", config.listing_url);
    }

    export::write_listing(export::create_file(&output)?, config.delimiter_byte()?, &records)
        .with_context(|| format!("Failed to write listing: {}", output.display()))?;
    println!("Wrote {} movies to {}", records.len(), file_link(&output));
    Ok(())
}

fn run_factors(config: &Config, first: i32, last: i32, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.data_dir.join("year_factors.json"));
    let client = HttpClient::new(config)?;

    let factors = FactorBuilder::new(&client, config)
        .build(first, last)
        .context("Failed to build year factors")?;

    for (year, factor) in factors.iter() {
        println!("{}  {:.4}", year, factor);
    }
    write_factors_file(&output, &factors)?;
    println!("Wrote {} year factors to {}", factors.len(), file_link(&output));
    Ok(())
}

fn run_pipeline(
    config: &Config,
    output: Option<PathBuf>,
    factors_output: Option<PathBuf>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| config.data_dir.join("scifimovies_dataset.csv"));
    let factors_output =
        factors_output.unwrap_or_else(|| config.data_dir.join("year_factors.json"));
    let client = HttpClient::new(config)?;

    let records = scrape_movies(&client, config);
    let years = records.iter().filter_map(|r| r.year);
    let (Some(first), Some(last)) = (years.clone().min(), years.max()) else {
        bail!(
            "No release years among {} collected records, cannot pick a CPI range",
            records.len()
        );
    };

    let factors = FactorBuilder::new(&client, config)
        .build(first, last)
        .context("Failed to build year factors")?;
    if let (Some(from), Some(to)) = (factors.first_year(), factors.last_year()) {
        tracing::info!(from, to, "year factors ready");
    }

    let normalized = normalize::normalize(&records, &factors);
    let failed = normalized.iter().filter(|r| r.is_err()).count();

    export::write_dataset(
        export::create_file(&output)?,
        config.delimiter_byte()?,
        &records,
        &normalized,
    )
    .with_context(|| format!("Failed to write dataset: {}", output.display()))?;
    write_factors_file(&factors_output, &factors)?;

    println!(
        "Wrote {} movies ({} without adjusted gross) to {}",
        records.len(),
        failed,
        file_link(&output)
    );
    println!("Wrote {} year factors to {}", factors.len(), file_link(&factors_output));
    Ok(())
}

fn run_clean(config: &Config) -> Result<()> {
    println!("Cleaning generated files...");

    let dirs = std::iter::once(&config.data_dir).chain(config.cache_dir.as_ref());
    for dir in dirs {
        if dir.exists() {
            fs::remove_dir_all(dir)
                .with_context(|| format!("Failed to remove {}", dir.display()))?;
            println!("  Removed {}/", dir.display());
        }
    }

    println!("Clean complete!");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Movies { output } => run_movies(&config, output),
        Commands::Factors {
            first,
            last,
            output,
        } => run_factors(&config, first, last, output),
        Commands::Run {
            output,
            factors_output,
        } => run_pipeline(&config, output, factors_output),
        Commands::Clean => run_clean(&config),
    }
}
