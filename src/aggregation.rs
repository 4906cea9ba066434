use std::collections::HashMap;

use chrono::Datelike;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Error;
use crate::reducer::{PositionSnapshot, PostTradeSnapshot, reduce};
use crate::transaction::{Ticker, TransactionRecord, TransactionType};
use crate::value::{Money, ValueError};

pub type PortfolioPositions = HashMap<Ticker, PositionSnapshot>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub aggregates: PortfolioPositions,
    /// `effects[i]` is the outcome of `transactions[i]`.
    pub effects: Vec<PostTradeSnapshot>,
}

/// Folds a chronologically ordered ledger into per-ticker positions.
pub fn calculate_aggregates(transactions: &[TransactionRecord]) -> Result<AggregateResult, Error> {
    let mut aggregates = PortfolioPositions::new();
    let mut effects = Vec::with_capacity(transactions.len());

    for (i, tx) in transactions.iter().enumerate() {
        if let Some(previous) = i.checked_sub(1).map(|p| &transactions[p]) {
            if tx.date() < previous.date() {
                return Err(Error::OutOfOrderTransaction {
                    row: tx.row(),
                    date: tx.date(),
                    previous: previous.date(),
                });
            }
        }

        let prev = aggregates.get(tx.ticker()).copied().unwrap_or_default();
        let effect = reduce(&prev, tx).map_err(|source| Error::Reduce {
            row: tx.row(),
            kind: tx.kind(),
            ticker: tx.ticker().to_string(),
            source,
        })?;

        debug!(
            row = tx.row(),
            ticker = tx.ticker(),
            kind = %tx.kind(),
            units_owned = %effect.units_owned,
            total_cost = %effect.total_cost,
            "applied transaction"
        );

        aggregates.insert(tx.ticker().to_string(), effect.snapshot());
        effects.push(effect);
    }

    info!(
        transactions = transactions.len(),
        tickers = aggregates.len(),
        "aggregated ledger"
    );

    Ok(AggregateResult {
        aggregates,
        effects,
    })
}

fn sum_by_ticker(
    transactions: &[TransactionRecord],
    result: &AggregateResult,
    year: i32,
    kind: TransactionType,
    pick: impl Fn(&PostTradeSnapshot) -> Option<Money>,
) -> Result<HashMap<Ticker, Money>, ValueError> {
    let mut totals: HashMap<Ticker, Money> = HashMap::new();
    for (tx, effect) in transactions.iter().zip(&result.effects) {
        if tx.kind() != kind || tx.date().year() != year {
            continue;
        }
        if let Some(amount) = pick(effect) {
            let total = totals.entry(tx.ticker().to_string()).or_default();
            *total = total.checked_add(amount)?;
        }
    }
    Ok(totals)
}

/// Realized gains of SELL transactions dated in `year`. Tickers without such
/// a sale are absent.
pub fn pending_gains_by_ticker(
    transactions: &[TransactionRecord],
    result: &AggregateResult,
    year: i32,
) -> Result<HashMap<Ticker, Money>, ValueError> {
    sum_by_ticker(transactions, result, year, TransactionType::Sell, |e| e.gain)
}

/// Staking income dated in `year`. Tickers without rewards are absent.
pub fn income_by_ticker(
    transactions: &[TransactionRecord],
    result: &AggregateResult,
    year: i32,
) -> Result<HashMap<Ticker, Money>, ValueError> {
    sum_by_ticker(transactions, result, year, TransactionType::StkRwd, |e| e.income)
}
