//! GVT token engine CLI
//!
//! Reward quotes, scenario replay against in-memory engines, and
//! configuration inspection.

mod config;
mod scenario;

use clap::{Parser, Subcommand};
use config::{GvtConfig, LoggingConfig};
use gvt_core::math::PERCENT;
use gvt_core::time::days;
use gvt_staking::accrual::{reward_for, validate_lock_duration};
use gvt_staking::{lock_multiplier, AccrualInputs};
use gvt_token::config::whole_tokens;
use scenario::Simulation;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "gvt")]
#[command(version)]
#[command(about = "PreGVT issuance and rGGP staking engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "gvt.toml")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote the staking reward for one position
    Quote {
        /// Staked amount in whole tokens
        #[arg(short, long)]
        amount: u64,

        /// Emission rate per token-second, scaled by 1e18
        #[arg(short, long, default_value = "1000000000000000")]
        rate: u128,

        /// Seconds of accrual
        #[arg(short, long, default_value = "86400")]
        elapsed: u64,

        /// Lock period in days
        #[arg(short, long, default_value = "30")]
        lock_days: u64,

        /// Ignore the lock-duration multiplier
        #[arg(long)]
        no_bonus: bool,

        /// Boost percent (100 = neutral)
        #[arg(short, long, default_value = "100")]
        boost: u32,
    },

    /// Replay a JSON scenario
    Simulate {
        /// Scenario file
        file: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_logging(settings: &LoggingConfig, verbose: bool, json: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if json || settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = GvtConfig::load(&cli.config)?;
    init_logging(&config.logging, cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Quote {
            amount,
            rate,
            elapsed,
            lock_days,
            no_bonus,
            boost,
        } => {
            let lock_duration = days(lock_days);
            validate_lock_duration(lock_duration)?;
            let inputs = AccrualInputs {
                amount: whole_tokens(amount),
                emission_rate: rate,
                elapsed,
                lock_duration,
                lock_bonus: !no_bonus,
                boost: boost as u128,
            };
            let reward = reward_for(&inputs)?;

            println!("Stake:      {} tokens for {} days", amount, lock_days);
            println!("Elapsed:    {} s", elapsed);
            println!(
                "Multiplier: {}%",
                if no_bonus { PERCENT } else { lock_multiplier(lock_duration) }
            );
            println!("Boost:      {}%", inputs.boost);
            println!("Reward:     {} (raw units)", reward);
        }

        Commands::Simulate { file, json } => {
            let content = std::fs::read_to_string(&file)?;
            let scenario = scenario::parse(&content)?;
            tracing::info!(
                "Replaying {} actions from {:?}",
                scenario.actions.len(),
                file
            );

            let report = Simulation::new(&config, scenario.start_time)?.run(&scenario);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for step in &report.steps {
                    let status = if step.ok { "ok " } else { "ERR" };
                    println!("{:>4} @{} {} {}: {}", step.index, step.at, status, step.action, step.detail);
                }
                println!();
                for recorded in &report.token_events {
                    println!("  token   @{} {:?}", recorded.at, recorded.event);
                }
                for recorded in &report.staking_events {
                    println!("  staking @{} {:?}", recorded.at, recorded.event);
                }
                println!();
                println!(
                    "{} steps, {} failed, {} token events, {} staking events",
                    report.steps.len(),
                    report.failures(),
                    report.token_events.len(),
                    report.staking_events.len()
                );
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
