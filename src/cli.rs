//! Command-line arguments and logging setup.

use std::path::PathBuf;

use chrono::{Datelike, Local};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

/// Compute adjusted cost base, capital gains and staking income from a
/// transaction ledger.
#[derive(Parser, Debug)]
#[command(name = "ledger-acb")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Ledger CSV with Date, Ticker, Type, Units, Unit Price, Fees and Net Transaction Value columns
    #[arg(default_value = "transactions.csv")]
    pub input: PathBuf,

    /// Tax year to summarize [default: current year]
    #[arg(short = 'y', long)]
    pub tax_year: Option<i32>,

    /// Where to write per-transaction effects [default: acb_effects_<year>.csv]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Args {
    pub fn tax_year(&self) -> i32 {
        self.tax_year.unwrap_or_else(|| Local::now().year())
    }

    pub fn output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("acb_effects_{}.csv", self.tax_year())))
    }

    pub fn init_logging(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        match self.log_format {
            LogFormat::Json => {
                fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
            LogFormat::Pretty => {
                fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
            }
        }
    }
}
