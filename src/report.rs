//! Plain-data views over an aggregation result for spreadsheet or CSV output.

use serde::Serialize;

use crate::aggregation::{AggregateResult, income_by_ticker, pending_gains_by_ticker};
use crate::transaction::{Ticker, TransactionRecord};
use crate::value::{Money, Shares, ValueError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReportRow {
    pub ticker: Ticker,
    pub units_owned: Shares,
    pub total_cost: Money,
    pub acb_per_unit: Money,
    pub realized_gain: Money,
    pub income: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectRow {
    pub total_cost: Money,
    pub acb_per_unit: Money,
    pub units_owned: Shares,
    pub gain: Option<Money>,
    pub income: Option<Money>,
}

pub fn asset_report_titles(year: i32) -> [String; 6] {
    [
        "Ticker".to_string(),
        "Units Owned".to_string(),
        "ACB".to_string(),
        "ACB Per Unit".to_string(),
        format!("Realized Capital Gain ({year})"),
        format!("Incurred Income ({year})"),
    ]
}

pub const EFFECT_TITLES: [&str; 5] = ["ACB", "ACB Per Unit", "Total Units Owned", "Gain", "Income"];

/// Held positions sorted by ticker, with the year's realized gain and income.
pub fn asset_report(
    transactions: &[TransactionRecord],
    result: &AggregateResult,
    year: i32,
) -> Result<Vec<AssetReportRow>, ValueError> {
    let gains = pending_gains_by_ticker(transactions, result, year)?;
    let income = income_by_ticker(transactions, result, year)?;

    let mut rows = result
        .aggregates
        .iter()
        .filter(|(_, position)| position.units_owned.is_positive())
        .map(|(ticker, position)| {
            Ok(AssetReportRow {
                ticker: ticker.clone(),
                units_owned: position.units_owned,
                total_cost: position.total_cost,
                acb_per_unit: position.acb_per_unit()?,
                realized_gain: gains.get(ticker).copied().unwrap_or_default(),
                income: income.get(ticker).copied().unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, ValueError>>()?;
    rows.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    Ok(rows)
}

pub fn transaction_effects(result: &AggregateResult) -> Result<Vec<EffectRow>, ValueError> {
    result
        .effects
        .iter()
        .map(|effect| {
            Ok(EffectRow {
                total_cost: effect.total_cost,
                acb_per_unit: effect.acb_per_unit()?,
                units_owned: effect.units_owned,
                gain: effect.gain,
                income: effect.income,
            })
        })
        .collect()
}

pub fn acb_per_unit(result: &AggregateResult, ticker: &str) -> Result<Option<Money>, ValueError> {
    result
        .aggregates
        .get(ticker)
        .map(|p| p.acb_per_unit())
        .transpose()
}

pub fn units_owned(result: &AggregateResult, ticker: &str) -> Option<Shares> {
    result.aggregates.get(ticker).map(|p| p.units_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::calculate_aggregates;
    use crate::sheet::{parse_table, read_table};
    use rust_decimal_macros::dec;

    const LEDGER: &str = "\
Type,Date,Ticker,Account,Units,Fees,Unit Price,Net Transaction Value
BUY,2024-05-20,TSE:VEQT,Wealthsimple,10,0,10,-100
BUY,2024-05-20,TSE:VEQT,Questrade,10,0,12,-120
BUY,2024-05-21,TSE:AAA,Questrade,5,0,2,
SELL,2024-06-01,TSE:VEQT,Wealthsimple,5,0,15,75
SELL,2024-06-02,TSE:AAA,Questrade,5,0,3,
STK_RWD,2024-07-01,ETH,Wallet,0.5,,100,
";

    fn ledger() -> (Vec<TransactionRecord>, AggregateResult) {
        let table = read_table(LEDGER.as_bytes()).unwrap();
        let txs = parse_table(&table).unwrap();
        let result = calculate_aggregates(&txs).unwrap();
        (txs, result)
    }

    #[test]
    fn asset_report_lists_held_positions_sorted() {
        let (txs, result) = ledger();
        let rows = asset_report(&txs, &result, 2024).unwrap();

        let tickers: Vec<_> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["ETH", "TSE:VEQT"]);

        let veqt = &rows[1];
        assert_eq!(veqt.units_owned, Shares::new(dec!(15)));
        assert_eq!(veqt.total_cost, Money::new(dec!(165)));
        assert_eq!(veqt.acb_per_unit, Money::new(dec!(11)));
        assert_eq!(veqt.realized_gain, Money::new(dec!(20)));
        assert_eq!(veqt.income, Money::ZERO);

        let eth = &rows[0];
        assert_eq!(eth.income, Money::new(dec!(50)));
        assert_eq!(eth.realized_gain, Money::ZERO);
    }

    #[test]
    fn asset_report_outside_the_year_has_zero_gains() {
        let (txs, result) = ledger();
        let rows = asset_report(&txs, &result, 2023).unwrap();
        assert!(rows.iter().all(|r| r.realized_gain == Money::ZERO && r.income == Money::ZERO));
        assert_eq!(asset_report_titles(2023)[4], "Realized Capital Gain (2023)");
    }

    #[test]
    fn effects_follow_input_order() {
        let (_, result) = ledger();
        let rows = transaction_effects(&result).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].total_cost, Money::new(dec!(100)));
        assert_eq!(rows[0].acb_per_unit, Money::new(dec!(10)));
        assert_eq!(rows[1].acb_per_unit, Money::new(dec!(11)));
        assert_eq!(rows[3].gain, Some(Money::new(dec!(20))));
        assert_eq!(rows[4].units_owned, Shares::ZERO);
        assert_eq!(rows[4].acb_per_unit, Money::ZERO);
        assert_eq!(rows[4].gain, Some(Money::new(dec!(5))));
        assert_eq!(rows[5].income, Some(Money::new(dec!(50))));
        assert_eq!(rows[2].gain, None);
    }

    #[test]
    fn point_queries() {
        let (_, result) = ledger();
        assert_eq!(acb_per_unit(&result, "TSE:VEQT"), Ok(Some(Money::new(dec!(11)))));
        assert_eq!(units_owned(&result, "TSE:AAA"), Some(Shares::ZERO));
        assert_eq!(acb_per_unit(&result, "TSE:AAA"), Ok(Some(Money::ZERO)));
        assert_eq!(acb_per_unit(&result, "MISSING"), Ok(None));
        assert_eq!(units_owned(&result, "MISSING"), None);
    }
}
