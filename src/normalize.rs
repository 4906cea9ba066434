//! Fills in whichever of units, unit price and net transaction value a ledger
//! row left out, or checks that all three agree.

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::Error;
use crate::transaction::{
    CashFlow, ComponentsRecord, NetOnlyRecord, NetOnlyType, RecordBase, Ticker, TransactionRecord,
    TransactionType,
};
use crate::value::{Money, Shares, ValueError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("provided net transaction value {provided} did not match expected {expected}")]
    InconsistentComponents { provided: Money, expected: Money },

    #[error(
        "net-only transaction rows are only supported for NCDIS, ROC; received {0}"
    )]
    UnsupportedNetOnlyType(TransactionType),

    #[error(
        "incomplete transaction data for {kind}: unit price={unit_price:?}, units={units:?}, net transaction value={net_transaction_value:?}"
    )]
    IncompleteTransactionData {
        kind: TransactionType,
        units: Option<Shares>,
        unit_price: Option<Money>,
        net_transaction_value: Option<Money>,
    },

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// A ledger row after cell parsing, before the missing values are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub row: usize,
    pub date: NaiveDate,
    pub ticker: Ticker,
    pub kind: TransactionType,
    pub units: Option<Shares>,
    pub unit_price: Option<Money>,
    pub net_transaction_value: Option<Money>,
    pub fees: Option<Money>,
}

pub fn normalize(raw: RawTransaction) -> Result<TransactionRecord, Error> {
    let row = raw.row;
    normalize_values(raw).map_err(|source| Error::Normalize { row, source })
}

fn expected_net_value(
    flow: CashFlow,
    units: Shares,
    unit_price: Money,
    fees: Money,
) -> Result<Money, ValueError> {
    unit_price
        .checked_mul(units.value())?
        .checked_mul(flow.sign())?
        .checked_sub(fees)
}

fn derive_units(
    flow: CashFlow,
    ntv: Money,
    unit_price: Money,
    fees: Money,
) -> Result<Shares, ValueError> {
    let gross = ntv.checked_add(fees)?.checked_mul(flow.sign())?;
    Ok(Shares::new(gross.ratio(unit_price)?))
}

fn derive_unit_price(
    flow: CashFlow,
    ntv: Money,
    units: Shares,
    fees: Money,
) -> Result<Money, ValueError> {
    let gross = ntv.checked_add(fees)?.checked_mul(flow.sign())?;
    if units.is_zero() {
        return Err(ValueError::DivisionByZero { kind: "money" });
    }
    gross.divide(units.value())
}

fn normalize_values(raw: RawTransaction) -> Result<TransactionRecord, NormalizeError> {
    let RawTransaction {
        row,
        date,
        ticker,
        kind,
        units,
        unit_price,
        net_transaction_value,
        fees,
    } = raw;
    let flow = kind.cash_flow();
    let fee_value = fees.unwrap_or(Money::ZERO);

    let base = |ntv: Money| RecordBase {
        row,
        date,
        ticker: ticker.clone(),
        net_transaction_value: ntv,
        fees,
    };
    let components = |ntv: Money, units: Shares, unit_price: Money| {
        TransactionRecord::Components(ComponentsRecord {
            base: base(ntv),
            kind,
            units,
            unit_price,
        })
    };

    match (units, unit_price, net_transaction_value) {
        (Some(units), Some(unit_price), provided) => {
            let expected = expected_net_value(flow, units, unit_price, fee_value)?;
            if let Some(provided) = provided {
                if provided != expected {
                    return Err(NormalizeError::InconsistentComponents { provided, expected });
                }
            }
            Ok(components(provided.unwrap_or(expected), units, unit_price))
        }
        (None, Some(unit_price), Some(ntv)) => {
            let units = derive_units(flow, ntv, unit_price, fee_value)?;
            Ok(components(ntv, units, unit_price))
        }
        (Some(units), None, Some(ntv)) => {
            let unit_price = derive_unit_price(flow, ntv, units, fee_value)?;
            Ok(components(ntv, units, unit_price))
        }
        (None, None, Some(ntv)) => {
            let kind: NetOnlyType = kind
                .net_only()
                .ok_or(NormalizeError::UnsupportedNetOnlyType(kind))?;
            Ok(TransactionRecord::NetOnly(NetOnlyRecord {
                base: base(ntv),
                kind,
            }))
        }
        (units, unit_price, None) => Err(NormalizeError::IncompleteTransactionData {
            kind,
            units,
            unit_price,
            net_transaction_value: None,
        }),
    }
}
