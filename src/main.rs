use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod deviation;
mod error;
mod extract;
mod history;
mod models;
mod parse;
mod report;
mod risk;

use deviation::Comparison;
use error::PipelineError;
use models::Period;

#[derive(Parser)]
#[command(name = "ewa-traffic-tracker")]
#[command(about = "Traffic-light status tracker for SAP EarlyWatch Alert reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Ingest a converted EWA report and compare it against history
    Ingest {
        #[arg(long)]
        file: PathBuf,
        /// Report period, e.g. 2025-11; read from the filename when omitted
        #[arg(long)]
        period: Option<Period>,
    },
    /// Print the stored traffic-light history
    History,
    /// Generate a markdown report of the latest comparison
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the JSON context handed to the UI and chatbot layer
    Context,
    /// Export the history as CSV for the trend-prediction model
    Export {
        #[arg(long, default_value = "history.csv")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Ingest { file, period } => {
            let history = db::load_history(&pool, parse::SYSTEM).await?;

            let blocks = extract::extract_blocks(&file)?;
            let period = period
                .or_else(|| parse::sniff_period(&file))
                .ok_or_else(|| {
                    PipelineError::InvalidPeriod(format!(
                        "no date found in {}; pass --period",
                        file.display()
                    ))
                })?;
            let candidate = parse::parse_report(&blocks, period)?;

            if history.contains(&candidate.system, candidate.period) {
                return Err(PipelineError::DuplicatePeriod {
                    system: candidate.system,
                    period: candidate.period,
                }
                .into());
            }

            // Compare against the pre-append latest, then make the append
            // durable before reporting anything as ingested.
            let comparison = deviation::compare(history.latest(), &candidate);
            let rating = risk::score(comparison.deviations());
            db::insert_record(&pool, &candidate).await?;

            println!(
                "Ingested {} {} (overall {}).",
                candidate.system, candidate.period, candidate.overall
            );
            match &comparison {
                Comparison::NoBaseline => {
                    println!("First report on file; nothing to compare yet.");
                }
                Comparison::Against {
                    previous_period,
                    deviations,
                } => {
                    println!("Against {previous_period}:");
                    for dev in deviations {
                        println!(
                            "- {}: {} -> {} ({})",
                            dev.section, dev.previous, dev.current, dev.direction
                        );
                    }
                }
            }
            println!("Risk rating: {rating}");
        }
        Commands::History => {
            let history = db::load_history(&pool, parse::SYSTEM).await?;
            if history.is_empty() {
                println!("No reports ingested yet.");
                return Ok(());
            }
            for record in history.all() {
                println!(
                    "{} {}: overall {}",
                    record.system, record.period, record.overall
                );
                for (section, status) in &record.sections {
                    println!("  {section}: {status}");
                }
            }
        }
        Commands::Report { out } => {
            let history = db::load_history(&pool, parse::SYSTEM).await?;
            let markdown = report::build_report(parse::SYSTEM, &history);
            std::fs::write(&out, markdown)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Context => {
            let history = db::load_history(&pool, parse::SYSTEM).await?;
            let context = report::build_context(parse::SYSTEM, &history);
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
        Commands::Export { out } => {
            let history = db::load_history(&pool, parse::SYSTEM).await?;
            report::export_history_csv(&history, &out)?;
            println!("History exported to {}.", out.display());
        }
    }

    Ok(())
}
