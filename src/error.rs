use chrono::NaiveDate;
use thiserror::Error;

use crate::normalize::NormalizeError;
use crate::reducer::ReduceError;
use crate::sheet::CellError;
use crate::transaction::TransactionType;
use crate::value::ValueError;

/// Every failure that aborts a computation. Row-scoped variants carry the
/// 1-based row of the ledger table they came from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{column} could not be found in titles [{titles}]")]
    ColumnNotFound { column: &'static str, titles: String },

    #[error("the ledger has no header row")]
    MissingHeader,

    #[error("[row: {row}]: failed to parse the transaction record")]
    Parse {
        row: usize,
        #[source]
        source: CellError,
    },

    #[error("[row: {row}]: failed to normalize the transaction values")]
    Normalize {
        row: usize,
        #[source]
        source: NormalizeError,
    },

    #[error(
        "[row: {row}]: transaction date {date} is earlier than the previous transaction date {previous}"
    )]
    OutOfOrderTransaction {
        row: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("[row: {row}]: failed to apply {kind} transaction for {ticker}")]
    Reduce {
        row: usize,
        kind: TransactionType,
        ticker: String,
        #[source]
        source: ReduceError,
    },

    #[error("failed to total the ACB report")]
    Report(#[from] ValueError),

    #[error("failed to read ledger csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read ledger: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn row(&self) -> Option<usize> {
        match self {
            Error::Parse { row, .. }
            | Error::Normalize { row, .. }
            | Error::OutOfOrderTransaction { row, .. }
            | Error::Reduce { row, .. } => Some(*row),
            Error::ColumnNotFound { .. }
            | Error::MissingHeader
            | Error::Report(_)
            | Error::Csv(_)
            | Error::Io(_) => None,
        }
    }
}

fn indent(text: &str, depth: usize) -> String {
    let pad = "  ".repeat(depth);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders an error followed by one nested `Cause:` block per source.
pub fn render_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut depth = 0;
    let mut cause = err.source();
    while let Some(inner) = cause {
        out.push('\n');
        out.push_str(&indent("Cause:", depth));
        out.push('\n');
        out.push_str(&indent(&inner.to_string(), depth));
        depth += 1;
        cause = inner.source();
    }
    out
}
