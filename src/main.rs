mod analyzer;
mod api_types;
mod charts;
mod config;
mod error;
mod models;
mod pipeline;
mod polarity;
mod preprocess;
mod remote;
mod render;
mod results;
mod sigv4;
mod table;
mod web;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use analyzer::Analyzer;
use config::AppConfig;
use error::InputError;
use pipeline::{run_batch, BatchJob};
use polarity::{PolarityLexicon, PolarityScorer};
use remote::ComprehendClient;

/// SentiTweet - tweet sentiment analysis with remote NLP and a local lexicon
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to YAML config file (overrides SENTITWEET_CONFIG environment variable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a CSV file, write results and charts
    Run {
        input_file: PathBuf,
        output_file: PathBuf,
        viz_dir: PathBuf,

        /// Column holding the text to analyze (default from config, "text")
        #[arg(long = "text_column")]
        text_column: Option<String>,

        /// First row to analyze, 0-based inclusive
        #[arg(long = "start_row")]
        start_row: Option<usize>,

        /// Row to stop at, exclusive
        #[arg(long = "end_row")]
        end_row: Option<usize>,
    },

    /// Regenerate the charts from a results CSV
    Charts { results_csv: PathBuf, viz_dir: PathBuf },

    /// Start the web dashboard (default when no subcommand is given)
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:5000
        #[arg(long)]
        bind: Option<String>,
    },
}

fn build_analyzer(cfg: &AppConfig) -> Result<Analyzer> {
    let client = ComprehendClient::new(&cfg.remote)?;
    let lexicon = PolarityLexicon::new().with_overrides(&cfg.lexicon_overrides);
    if !cfg.lexicon_overrides.is_empty() {
        debug!("Lexicon overrides applied - words={}", cfg.lexicon_overrides.len());
    }
    Ok(Analyzer::new(
        Arc::new(client),
        PolarityScorer::new(lexicon),
        cfg.remote.language_code.clone(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load_config(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting sentitweet");
    debug!(
        "Config - endpoint={}, region={}, language={}, concurrency={}",
        cfg.remote.endpoint_url(),
        cfg.remote.region,
        cfg.remote.language_code,
        cfg.batch.concurrency
    );

    match args.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Run {
            input_file,
            output_file,
            viz_dir,
            text_column,
            start_row,
            end_row,
        } => {
            let job = BatchJob {
                input: input_file,
                output: output_file,
                viz_dir,
                text_column: text_column.unwrap_or_else(|| cfg.batch.text_column.clone()),
                start_row,
                end_row,
            };
            let analyzer = build_analyzer(&cfg)?;
            match run_batch(&job, &analyzer, &cfg).await {
                Ok(summary) => {
                    println!(
                        "Processed {} rows ({} failed). Results saved to {}",
                        summary.rows_processed,
                        summary.rows_failed,
                        job.output.display()
                    );
                    println!(
                        "Visualizations saved to {} ({} of 5 charts)",
                        job.viz_dir.display(),
                        summary.charts_written
                    );
                    Ok(())
                }
                Err(e) => match e.downcast_ref::<InputError>() {
                    Some(input) => {
                        eprintln!("Error: {}", input);
                        Ok(())
                    }
                    None => Err(e),
                },
            }
        }
        Command::Charts { results_csv, viz_dir } => {
            if !results_csv.exists() {
                eprintln!("Error: results file {} not found", results_csv.display());
                return Ok(());
            }
            let rows = results::read_results(&results_csv)?;
            let report = charts::write_all_charts(&viz_dir, &rows, &cfg.charts)?;
            println!(
                "Visualizations saved to {} ({} of 5 charts)",
                viz_dir.display(),
                report.written.len()
            );
            Ok(())
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            let state = web::AppState {
                analyzer: build_analyzer(&cfg)?,
                config: Arc::new(cfg),
            };
            web::serve(state, &bind).await
        }
    }
}
