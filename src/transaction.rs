use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::value::{Money, Shares};

pub type Ticker = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction type: {0}")]
pub struct UnknownTransactionType(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TransactionType {
    #[serde(rename = "TRF_IN")]
    TrfIn,
    #[serde(rename = "TRF_OUT")]
    TrfOut,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "DRIP")]
    Drip,
    #[serde(rename = "STK_RWD")]
    StkRwd,
    #[serde(rename = "NCDIS")]
    Ncdis,
    #[serde(rename = "ROC")]
    Roc,
}

/// Direction of cash relative to the investor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashFlow {
    Inflow,
    Outflow,
}

impl CashFlow {
    pub fn sign(self) -> Decimal {
        match self {
            CashFlow::Inflow => Decimal::ONE,
            CashFlow::Outflow => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for CashFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashFlow::Inflow => write!(f, "inflow"),
            CashFlow::Outflow => write!(f, "outflow"),
        }
    }
}

impl TransactionType {
    pub const ALL: [TransactionType; 8] = [
        TransactionType::TrfIn,
        TransactionType::TrfOut,
        TransactionType::Buy,
        TransactionType::Sell,
        TransactionType::Drip,
        TransactionType::StkRwd,
        TransactionType::Ncdis,
        TransactionType::Roc,
    ];

    pub fn code(self) -> &'static str {
        match self {
            TransactionType::TrfIn => "TRF_IN",
            TransactionType::TrfOut => "TRF_OUT",
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Drip => "DRIP",
            TransactionType::StkRwd => "STK_RWD",
            TransactionType::Ncdis => "NCDIS",
            TransactionType::Roc => "ROC",
        }
    }

    /// Conventional sign of the net transaction value.
    pub fn cash_flow(self) -> CashFlow {
        match self {
            TransactionType::TrfIn
            | TransactionType::Sell
            | TransactionType::StkRwd
            | TransactionType::Ncdis
            | TransactionType::Roc => CashFlow::Inflow,
            TransactionType::Buy | TransactionType::Drip | TransactionType::TrfOut => {
                CashFlow::Outflow
            }
        }
    }

    pub fn net_only(self) -> Option<NetOnlyType> {
        match self {
            TransactionType::Ncdis => Some(NetOnlyType::Ncdis),
            TransactionType::Roc => Some(NetOnlyType::Roc),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TransactionType::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTransactionType(s.to_string()))
    }
}

/// The types that may be booked from a net transaction value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetOnlyType {
    Ncdis,
    Roc,
}

impl NetOnlyType {
    pub const ALL: [NetOnlyType; 2] = [NetOnlyType::Ncdis, NetOnlyType::Roc];
}

impl From<NetOnlyType> for TransactionType {
    fn from(kind: NetOnlyType) -> Self {
        match kind {
            NetOnlyType::Ncdis => TransactionType::Ncdis,
            NetOnlyType::Roc => TransactionType::Roc,
        }
    }
}

/// Fields shared by every ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBase {
    pub row: usize,
    pub date: NaiveDate,
    pub ticker: Ticker,
    pub net_transaction_value: Money,
    pub fees: Option<Money>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentsRecord {
    pub base: RecordBase,
    pub kind: TransactionType,
    pub units: Shares,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetOnlyRecord {
    pub base: RecordBase,
    pub kind: NetOnlyType,
}

/// A normalized ledger row. Rows without units and a unit price can only be
/// distributions, which `NetOnlyType` enforces.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionRecord {
    Components(ComponentsRecord),
    NetOnly(NetOnlyRecord),
}

impl TransactionRecord {
    pub fn base(&self) -> &RecordBase {
        match self {
            TransactionRecord::Components(tx) => &tx.base,
            TransactionRecord::NetOnly(tx) => &tx.base,
        }
    }

    pub fn kind(&self) -> TransactionType {
        match self {
            TransactionRecord::Components(tx) => tx.kind,
            TransactionRecord::NetOnly(tx) => tx.kind.into(),
        }
    }

    pub fn row(&self) -> usize {
        self.base().row
    }

    pub fn date(&self) -> NaiveDate {
        self.base().date
    }

    pub fn ticker(&self) -> &str {
        &self.base().ticker
    }

    pub fn net_transaction_value(&self) -> Money {
        self.base().net_transaction_value
    }

    pub fn fees(&self) -> Option<Money> {
        self.base().fees
    }

    pub fn units(&self) -> Option<Shares> {
        match self {
            TransactionRecord::Components(tx) => Some(tx.units),
            TransactionRecord::NetOnly(_) => None,
        }
    }

    pub fn unit_price(&self) -> Option<Money> {
        match self {
            TransactionRecord::Components(tx) => Some(tx.unit_price),
            TransactionRecord::NetOnly(_) => None,
        }
    }
}
