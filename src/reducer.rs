//! One state transition per transaction type over a pooled-average-cost position.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::transaction::{
    CashFlow, ComponentsRecord, NetOnlyType, RecordBase, TransactionRecord, TransactionType,
};
use crate::value::{Money, Shares, ValueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PositionSnapshot {
    pub units_owned: Shares,
    pub total_cost: Money,
}

impl PositionSnapshot {
    /// Pooled average cost per unit; zero when nothing is held.
    pub fn acb_per_unit(&self) -> Result<Money, ValueError> {
        if self.units_owned.is_positive() {
            self.total_cost.divide(self.units_owned.value())
        } else {
            Ok(Money::ZERO)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PostTradeSnapshot {
    pub units_owned: Shares,
    pub total_cost: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income: Option<Money>,
}

impl PostTradeSnapshot {
    fn position(units_owned: Shares, total_cost: Money) -> Self {
        Self {
            units_owned,
            total_cost,
            gain: None,
            income: None,
        }
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            units_owned: self.units_owned,
            total_cost: self.total_cost,
        }
    }

    pub fn acb_per_unit(&self) -> Result<Money, ValueError> {
        self.snapshot().acb_per_unit()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReduceError {
    #[error("cannot have a {kind} transaction without owning any units")]
    NoUnitsOwned { kind: TransactionType },

    #[error("cannot sell more units ({requested}) than owned ({owned})")]
    OverSell { requested: Shares, owned: Shares },

    #[error("cannot transfer out more units ({requested}) than owned ({owned})")]
    OverTransfer { requested: Shares, owned: Shares },

    #[error(
        "ACB per unit {acb_per_unit} ({total_cost} / {units_owned}) before the transfer out did not match the transaction's unit price {unit_price}"
    )]
    AcbMismatch {
        acb_per_unit: Money,
        total_cost: Money,
        units_owned: Shares,
        unit_price: Money,
    },

    #[error(
        "{kind} transactions are expected to carry a net transaction value signed as a cash {expected}, received {net_transaction_value}"
    )]
    SignConventionViolation {
        kind: TransactionType,
        expected: CashFlow,
        net_transaction_value: Money,
    },

    #[error("{kind} distributions must have a non-negative net transaction value, received {net_transaction_value}")]
    NegativeDistribution {
        kind: TransactionType,
        net_transaction_value: Money,
    },

    #[error(transparent)]
    Value(#[from] ValueError),
}

fn check_sign(kind: TransactionType, ntv: Money) -> Result<(), ReduceError> {
    let expected = kind.cash_flow();
    let violates = match expected {
        CashFlow::Inflow => ntv.is_negative(),
        CashFlow::Outflow => ntv.is_positive(),
    };
    if violates {
        return Err(ReduceError::SignConventionViolation {
            kind,
            expected,
            net_transaction_value: ntv,
        });
    }
    Ok(())
}

/// BUY and DRIP. Purchase fees are already inside the net value, so they
/// land in the cost base.
fn apply_buy(
    prev: &PositionSnapshot,
    tx: &ComponentsRecord,
) -> Result<PostTradeSnapshot, ReduceError> {
    let ntv = tx.base.net_transaction_value;
    check_sign(tx.kind, ntv)?;

    Ok(PostTradeSnapshot::position(
        prev.units_owned.checked_add(tx.units)?,
        prev.total_cost.checked_add(ntv.abs())?,
    ))
}

/// Transfers may be the first event for a ticker and seed its cost base.
fn apply_transfer_in(
    prev: &PositionSnapshot,
    tx: &ComponentsRecord,
) -> Result<PostTradeSnapshot, ReduceError> {
    let ntv = tx.base.net_transaction_value;
    check_sign(tx.kind, ntv)?;

    Ok(PostTradeSnapshot::position(
        prev.units_owned.checked_add(tx.units)?,
        prev.total_cost.checked_add(ntv)?,
    ))
}

fn apply_transfer_out(
    prev: &PositionSnapshot,
    tx: &ComponentsRecord,
) -> Result<PostTradeSnapshot, ReduceError> {
    if !prev.units_owned.is_positive() {
        return Err(ReduceError::NoUnitsOwned { kind: tx.kind });
    }
    if tx.units > prev.units_owned {
        return Err(ReduceError::OverTransfer {
            requested: tx.units,
            owned: prev.units_owned,
        });
    }
    let ntv = tx.base.net_transaction_value;
    check_sign(tx.kind, ntv)?;

    let acb_per_unit = prev.acb_per_unit()?;
    if acb_per_unit != tx.unit_price {
        return Err(ReduceError::AcbMismatch {
            acb_per_unit,
            total_cost: prev.total_cost,
            units_owned: prev.units_owned,
            unit_price: tx.unit_price,
        });
    }

    Ok(PostTradeSnapshot::position(
        prev.units_owned.checked_sub(tx.units)?,
        prev.total_cost.checked_add(ntv)?,
    ))
}

fn apply_sell(
    prev: &PositionSnapshot,
    tx: &ComponentsRecord,
) -> Result<PostTradeSnapshot, ReduceError> {
    if !prev.units_owned.is_positive() {
        return Err(ReduceError::NoUnitsOwned { kind: tx.kind });
    }
    if tx.units > prev.units_owned {
        return Err(ReduceError::OverSell {
            requested: tx.units,
            owned: prev.units_owned,
        });
    }
    let proceeds = tx.base.net_transaction_value;
    check_sign(tx.kind, proceeds)?;

    let units_owned = prev.units_owned.checked_sub(tx.units)?;
    // Selling the whole pool disposes of the whole cost base.
    let cost_base = if units_owned.is_zero() {
        prev.total_cost
    } else {
        prev.acb_per_unit()?.checked_mul(tx.units.value())?
    };

    // Sale fees only reduce proceeds; they never touch the remaining cost base.
    Ok(PostTradeSnapshot {
        units_owned,
        total_cost: prev.total_cost.checked_sub(cost_base)?,
        gain: Some(proceeds.checked_sub(cost_base)?),
        income: None,
    })
}

fn apply_stake_reward(
    prev: &PositionSnapshot,
    tx: &ComponentsRecord,
) -> Result<PostTradeSnapshot, ReduceError> {
    let ntv = tx.base.net_transaction_value;
    check_sign(tx.kind, ntv)?;

    Ok(PostTradeSnapshot {
        units_owned: prev.units_owned.checked_add(tx.units)?,
        total_cost: prev.total_cost.checked_add(ntv)?,
        gain: None,
        income: Some(ntv),
    })
}

fn check_distribution(kind: TransactionType, ntv: Money) -> Result<(), ReduceError> {
    if ntv.is_negative() {
        return Err(ReduceError::NegativeDistribution {
            kind,
            net_transaction_value: ntv,
        });
    }
    Ok(())
}

fn apply_non_cash_distribution(
    prev: &PositionSnapshot,
    base: &RecordBase,
) -> Result<PostTradeSnapshot, ReduceError> {
    let ntv = base.net_transaction_value;
    check_distribution(TransactionType::Ncdis, ntv)?;

    Ok(PostTradeSnapshot::position(
        prev.units_owned,
        prev.total_cost.checked_add(ntv)?,
    ))
}

fn apply_return_of_capital(
    prev: &PositionSnapshot,
    base: &RecordBase,
) -> Result<PostTradeSnapshot, ReduceError> {
    let ntv = base.net_transaction_value;
    check_distribution(TransactionType::Roc, ntv)?;

    let total_cost = prev.total_cost.checked_sub(ntv)?;
    if total_cost.is_negative() {
        warn!(
            row = base.row,
            ticker = %base.ticker,
            total_cost = %total_cost,
            "return of capital drove total cost below zero"
        );
    }
    Ok(PostTradeSnapshot::position(prev.units_owned, total_cost))
}

fn apply_net_only(
    prev: &PositionSnapshot,
    kind: NetOnlyType,
    base: &RecordBase,
) -> Result<PostTradeSnapshot, ReduceError> {
    match kind {
        NetOnlyType::Ncdis => apply_non_cash_distribution(prev, base),
        NetOnlyType::Roc => apply_return_of_capital(prev, base),
    }
}

/// Applies one normalized transaction to the prior position of its ticker.
pub fn reduce(
    prev: &PositionSnapshot,
    record: &TransactionRecord,
) -> Result<PostTradeSnapshot, ReduceError> {
    match record {
        TransactionRecord::Components(tx) => match tx.kind {
            TransactionType::Buy | TransactionType::Drip => apply_buy(prev, tx),
            TransactionType::TrfIn => apply_transfer_in(prev, tx),
            TransactionType::TrfOut => apply_transfer_out(prev, tx),
            TransactionType::Sell => apply_sell(prev, tx),
            TransactionType::StkRwd => apply_stake_reward(prev, tx),
            TransactionType::Ncdis => apply_net_only(prev, NetOnlyType::Ncdis, &tx.base),
            TransactionType::Roc => apply_net_only(prev, NetOnlyType::Roc, &tx.base),
        },
        TransactionRecord::NetOnly(tx) => apply_net_only(prev, tx.kind, &tx.base),
    }
}
