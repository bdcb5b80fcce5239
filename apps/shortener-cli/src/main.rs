//! shortener-cli — command-line front end for the link registry.
//!
//! Shortens URLs (one at a time or in batches), resolves shortcodes the way a
//! redirect route would, and prints click statistics, optionally refreshing
//! them on an interval.
//!
//! Run:
//! ```bash
//! shorten create https://example.com/very/long/url --validity 60
//! shorten create https://example.com --code mycode123
//! printf 'https://a.com\nhttps://b.com bee 90\n' | shorten batch
//! shorten resolve mycode123 --referrer https://news.example
//! shorten stats --watch
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod backend;
mod commands;
mod config;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::CommandError;

#[derive(Parser, Debug)]
#[command(name = "shorten", version, about = "Shorten URLs and inspect their click statistics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shorten a single URL
    Create {
        url: String,
        /// Custom shortcode; generated when omitted
        #[arg(long)]
        code: Option<String>,
        /// Minutes the link stays valid
        #[arg(long, allow_negative_numbers = true)]
        validity: Option<i64>,
    },
    /// Shorten every `url [shortcode|-] [minutes]` line of a file (stdin when omitted or `-`)
    Batch { file: Option<PathBuf> },
    /// Resolve a shortcode and record the click
    Resolve {
        code: String,
        /// Referring origin to record; "direct" when omitted
        #[arg(long)]
        referrer: Option<String>,
    },
    /// Show totals and per-link click data
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
        /// Keep refreshing every STATS_REFRESH_SECS until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&cfg);

    let svc = match commands::build_service(&cfg) {
        Ok(svc) => svc,
        Err(e) => {
            error!(error = %e, "failed to open link storage");
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &cfg, &svc).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Command,
    cfg: &config::Config,
    svc: &commands::Service,
) -> Result<ExitCode, CommandError> {
    match command {
        Command::Create {
            url,
            code,
            validity,
        } => {
            let validity = validity.unwrap_or(cfg.default_validity_minutes);
            println!("{}", commands::shorten(svc, &url, code, validity)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Batch { file } => {
            let raw = match file {
                Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)?,
                _ => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let inputs = commands::parse_batch(&raw, cfg.default_validity_minutes)?;
            let outcome = commands::batch(svc, inputs);
            if !outcome.report.is_empty() {
                println!("{}", outcome.report);
            }
            info!(created = outcome.created, failed = outcome.failed, "batch finished");
            Ok(if outcome.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Resolve { code, referrer } => {
            match commands::resolve(svc, &code, referrer.as_deref()) {
                Ok(url) => {
                    println!("{}", url);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e @ (CommandError::NotFound(_) | CommandError::Expired(_))) => {
                    // Where a browser would be sent back to the landing page
                    eprintln!("{}; returning to {}", e, cfg.origin);
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e),
            }
        }
        Command::Stats { json, watch } => {
            if !watch {
                print_stats(svc, json)?;
                return Ok(ExitCode::SUCCESS);
            }
            let mut ticker = tokio::time::interval(Duration::from_secs(cfg.stats_refresh_secs));
            loop {
                tokio::select! {
                    _ = ticker.tick() => print_stats(svc, json)?,
                    _ = tokio::signal::ctrl_c() => {
                        info!("stats watch stopped");
                        return Ok(ExitCode::SUCCESS);
                    }
                }
            }
        }
    }
}

fn print_stats(svc: &commands::Service, json: bool) -> Result<(), CommandError> {
    let report = svc.compute_stats();
    if json {
        println!("{}", commands::stats_json(&report)?);
    } else {
        println!("{}", commands::render_stats(&report));
    }
    Ok(())
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries command output, so logs go to stderr
    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}
