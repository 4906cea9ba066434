mod cli;

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use ledger_acb::report::{
    AssetReportRow, EFFECT_TITLES, asset_report, asset_report_titles, transaction_effects,
};
use ledger_acb::sheet::Column;
use ledger_acb::{
    AggregateResult, Error, Money, TransactionRecord, ValueError, calculate_aggregates,
    income_by_ticker, load_table, parse_table, pending_gains_by_ticker, render_chain,
};

use cli::Args;

/// Fields follow the input columns and then `EFFECT_TITLES`.
#[derive(Debug, Serialize)]
struct EffectCsvRow {
    row: usize,
    date: String,
    ticker: String,
    #[serde(rename = "type")]
    kind: String,
    units: String,
    unit_price: String,
    fees: String,
    net_transaction_value: String,
    total_cost: String,
    acb_per_unit: String,
    units_owned: String,
    gain: String,
    income: String,
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn effect_titles() -> Vec<&'static str> {
    std::iter::once("Row")
        .chain(Column::ALL.iter().map(|column| column.title()))
        .chain(EFFECT_TITLES)
        .collect()
}

fn effect_rows(
    transactions: &[TransactionRecord],
    result: &AggregateResult,
) -> Result<Vec<EffectCsvRow>, ValueError> {
    let rows = transactions
        .iter()
        .zip(transaction_effects(result)?)
        .map(|(tx, effect)| EffectCsvRow {
            row: tx.row(),
            date: tx.date().format("%Y-%m-%d").to_string(),
            ticker: tx.ticker().to_string(),
            kind: tx.kind().to_string(),
            units: opt(tx.units()),
            unit_price: opt(tx.unit_price()),
            fees: opt(tx.fees()),
            net_transaction_value: tx.net_transaction_value().to_string(),
            total_cost: effect.total_cost.to_string(),
            acb_per_unit: effect.acb_per_unit.to_string(),
            units_owned: effect.units_owned.to_string(),
            gain: opt(effect.gain),
            income: opt(effect.income),
        })
        .collect();
    Ok(rows)
}

fn write_effects(path: &Path, rows: &[EffectCsvRow]) -> Result<(), Error> {
    let out_file = File::create(path)?;
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out_file);
    wtr.write_record(effect_titles())?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_summary(
    tax_year: i32,
    transactions: &[TransactionRecord],
    result: &AggregateResult,
    report: &[AssetReportRow],
) -> Result<(), ValueError> {
    let gains = pending_gains_by_ticker(transactions, result, tax_year)?;
    let income = income_by_ticker(transactions, result, tax_year)?;
    let gain = Money::checked_sum(gains.into_values())?;
    let income = Money::checked_sum(income.into_values())?;

    println!("\n=== ACB SUMMARY ===");
    println!("Tax year: {}", tax_year);
    println!("Transactions: {}", result.effects.len());
    println!("Net capital gain/loss: {}", gain);
    println!("Staking income: {}", income);

    println!("\n=== ENDING POSITIONS (units + ACB) ===");
    println!("{}", asset_report_titles(tax_year).join(" | "));
    for row in report {
        println!(
            "{} | {} | {} | {} | {} | {}",
            row.ticker,
            row.units_owned,
            row.total_cost,
            row.acb_per_unit,
            row.realized_gain,
            row.income
        );
    }

    let mut closed: Vec<_> = result
        .aggregates
        .iter()
        .filter(|(_, p)| !p.units_owned.is_positive())
        .map(|(ticker, _)| ticker.as_str())
        .collect();
    if !closed.is_empty() {
        closed.sort();
        println!("\nClosed positions: {}", closed.join(", "));
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), Error> {
    let tax_year = args.tax_year();
    let output = args.output();

    let table = load_table(&args.input)?;
    let transactions = parse_table(&table)?;
    let result = calculate_aggregates(&transactions)?;

    write_effects(&output, &effect_rows(&transactions, &result)?)?;
    info!(path = %output.display(), "wrote transaction effects");

    let report = asset_report(&transactions, &result, tax_year)?;
    print_summary(tax_year, &transactions, &result, &report)?;

    println!("\nWrote transaction effects: {}", output.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    args.init_logging();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_chain(&err));
            ExitCode::FAILURE
        }
    }
}
