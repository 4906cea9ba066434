//! Turns a header-led table of raw cells (a spreadsheet range or a CSV file)
//! into normalized transaction records.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::error::Error;
use crate::normalize::{RawTransaction, normalize};
use crate::transaction::{TransactionRecord, TransactionType, UnknownTransactionType};
use crate::value::{Money, Shares, ValueError};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// CSV fields are text; empty fields are absent.
    pub fn from_text(field: &str) -> Self {
        if field.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(field.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Date(d) => write!(f, "{d}"),
        }
    }
}

pub type SheetRow = Vec<Cell>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellError {
    #[error(transparent)]
    UnknownTransactionType(#[from] UnknownTransactionType),

    #[error("{label} must be a valid date, received: {value}")]
    InvalidDate { label: &'static str, value: String },

    #[error("{label} must be a string, received: {value}")]
    InvalidText { label: &'static str, value: String },

    #[error("{label} must be a non-empty string")]
    EmptyText { label: &'static str },

    #[error("{label} must be a finite number, received: {value}")]
    InvalidNumber { label: &'static str, value: String },

    #[error("{label}: {source}")]
    Value {
        label: &'static str,
        #[source]
        source: ValueError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Ticker,
    Type,
    Units,
    UnitPrice,
    Fees,
    NetTransactionValue,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Date,
        Column::Ticker,
        Column::Type,
        Column::Units,
        Column::UnitPrice,
        Column::Fees,
        Column::NetTransactionValue,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Column::Date => "Date",
            Column::Ticker => "Ticker",
            Column::Type => "Type",
            Column::Units => "Units",
            Column::UnitPrice => "Unit Price",
            Column::Fees => "Fees",
            Column::NetTransactionValue => "Net Transaction Value",
        }
    }
}

/// Position of each known column in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices([usize; 7]);

impl ColumnIndices {
    pub fn get(&self, column: Column) -> usize {
        self.0[column as usize]
    }
}

pub fn calculate_column_indices(titles: &[Cell]) -> Result<ColumnIndices, Error> {
    let mut indices = [0; 7];
    for column in Column::ALL {
        let found = titles.iter().position(|title| match title {
            Cell::Text(s) => s.trim().eq_ignore_ascii_case(column.title()),
            _ => false,
        });
        indices[column as usize] = found.ok_or_else(|| Error::ColumnNotFound {
            column: column.title(),
            titles: titles
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })?;
    }
    Ok(ColumnIndices(indices))
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

fn parse_date(cell: &Cell, label: &'static str) -> Result<NaiveDate, CellError> {
    let invalid = || CellError::InvalidDate {
        label,
        value: cell.to_string(),
    };
    match cell {
        Cell::Date(d) => Ok(*d),
        Cell::Text(s) => {
            let s = s.trim();
            for fmt in DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return Ok(d);
                }
            }
            for fmt in DATE_TIME_FORMATS {
                if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Ok(t.date());
                }
            }
            Err(invalid())
        }
        _ => Err(invalid()),
    }
}

fn parse_text(cell: &Cell, label: &'static str) -> Result<String, CellError> {
    match cell {
        Cell::Text(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Cell::Text(_) | Cell::Empty => Err(CellError::EmptyText { label }),
        other => Err(CellError::InvalidText {
            label,
            value: other.to_string(),
        }),
    }
}

fn parse_number<T>(
    cell: &Cell,
    label: &'static str,
    strip: &[char],
    from_f64: fn(f64) -> Result<T, ValueError>,
    from_decimal: fn(Decimal) -> T,
) -> Result<Option<T>, CellError> {
    let invalid = || CellError::InvalidNumber {
        label,
        value: cell.to_string(),
    };
    if cell.is_blank() {
        return Ok(None);
    }
    match cell {
        Cell::Number(n) => from_f64(*n)
            .map(Some)
            .map_err(|source| CellError::Value { label, source }),
        Cell::Text(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && !strip.contains(c)).collect();
            let cleaned = cleaned.trim();
            Decimal::from_str(cleaned)
                .or_else(|_| Decimal::from_scientific(cleaned))
                .map(|d| Some(from_decimal(d)))
                .map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

fn optional_money(cell: &Cell, label: &'static str) -> Result<Option<Money>, CellError> {
    parse_number(cell, label, &['$'], Money::from_f64, Money::new)
}

fn optional_shares(cell: &Cell, label: &'static str) -> Result<Option<Shares>, CellError> {
    parse_number(cell, label, &[], Shares::from_f64, Shares::new)
}

static EMPTY: Cell = Cell::Empty;

fn parse_raw(row: usize, cells: &[Cell], indices: &ColumnIndices) -> Result<RawTransaction, CellError> {
    let cell = |column: Column| cells.get(indices.get(column)).unwrap_or(&EMPTY);

    let kind = match cell(Column::Type) {
        Cell::Text(s) => TransactionType::from_str(s)?,
        other => return Err(UnknownTransactionType(other.to_string()).into()),
    };

    Ok(RawTransaction {
        row,
        date: parse_date(cell(Column::Date), "Transaction date")?,
        ticker: parse_text(cell(Column::Ticker), "Ticker")?,
        kind,
        units: optional_shares(cell(Column::Units), "Units")?,
        unit_price: optional_money(cell(Column::UnitPrice), "Unit price")?,
        fees: optional_money(cell(Column::Fees), "Fees")?,
        net_transaction_value: optional_money(
            cell(Column::NetTransactionValue),
            "Net transaction value",
        )?,
    })
}

pub fn parse_transaction_record(
    row: usize,
    cells: &[Cell],
    indices: &ColumnIndices,
) -> Result<TransactionRecord, Error> {
    let raw = parse_raw(row, cells, indices).map_err(|source| Error::Parse { row, source })?;
    normalize(raw)
}

/// Parses a whole table. Fully blank rows are skipped, the first remaining row
/// is the header, and records are numbered by their 1-based row in `table`.
pub fn parse_table(table: &[SheetRow]) -> Result<Vec<TransactionRecord>, Error> {
    let mut rows = table
        .iter()
        .enumerate()
        .filter(|(_, cells)| !cells.iter().all(Cell::is_blank));

    let (_, header) = rows.next().ok_or(Error::MissingHeader)?;
    let indices = calculate_column_indices(header)?;

    let records = rows
        .map(|(i, cells)| parse_transaction_record(i + 1, cells, &indices))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(records = records.len(), "parsed ledger table");
    Ok(records)
}

pub fn read_table<R: Read>(reader: R) -> Result<Vec<SheetRow>, Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut table = Vec::new();
    for record in rdr.records() {
        let record = record?;
        table.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(table)
}

pub fn load_table(path: impl AsRef<Path>) -> Result<Vec<SheetRow>, Error> {
    let f = File::open(path)?;
    read_table(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizeError;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn headers(titles: &[&str]) -> Vec<Cell> {
        titles.iter().map(|t| text(t)).collect()
    }

    fn standard_indices() -> ColumnIndices {
        calculate_column_indices(&headers(&[
            "Type",
            "Date",
            "Ticker",
            "Units",
            "Fees",
            "Unit Price",
            "Net Transaction Value",
        ]))
        .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> Cell {
        Cell::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn parse_err(cells: Vec<Cell>) -> CellError {
        match parse_transaction_record(2, &cells, &standard_indices()) {
            Err(Error::Parse { source, .. }) => source,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn maps_column_indices() {
        let indices = standard_indices();
        assert_eq!(indices.get(Column::Type), 0);
        assert_eq!(indices.get(Column::Date), 1);
        assert_eq!(indices.get(Column::Ticker), 2);
        assert_eq!(indices.get(Column::Units), 3);
        assert_eq!(indices.get(Column::Fees), 4);
        assert_eq!(indices.get(Column::UnitPrice), 5);
        assert_eq!(indices.get(Column::NetTransactionValue), 6);
    }

    #[test]
    fn normalizes_header_whitespace_and_case() {
        let indices = calculate_column_indices(&headers(&[
            "type",
            "DATE",
            "Ticker",
            "Account",
            "Units",
            " Fees ",
            " unit price ",
            " Net Transaction Value ",
        ]))
        .unwrap();
        assert_eq!(indices.get(Column::Units), 4);
        assert_eq!(indices.get(Column::Fees), 5);
        assert_eq!(indices.get(Column::NetTransactionValue), 7);
    }

    #[test]
    fn missing_column_is_named() {
        let err = calculate_column_indices(&headers(&["Type", "Date", "Ticker", "Units"])).unwrap_err();
        match err {
            Error::ColumnNotFound { column, titles } => {
                assert_eq!(column, "Unit Price");
                assert_eq!(titles, "Type, Date, Ticker, Units");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_and_normalizes_a_record() {
        let record = parse_transaction_record(
            2,
            &[
                text(" buy "),
                day(2021, 5, 20),
                text(" TSE:SHOP "),
                Cell::Number(10.0),
                Cell::Number(0.0),
                Cell::Number(151.07),
                Cell::Empty,
            ],
            &standard_indices(),
        )
        .unwrap();

        assert_eq!(record.kind(), TransactionType::Buy);
        assert_eq!(record.ticker(), "TSE:SHOP");
        assert_eq!(record.row(), 2);
        assert_eq!(record.units(), Some(Shares::new(dec!(10))));
        assert_eq!(record.net_transaction_value(), Money::new(dec!(-1510.70)));
    }

    #[test]
    fn parses_numbers_with_separators_and_dollar_signs() {
        let record = parse_transaction_record(
            2,
            &[
                text("BUY"),
                text("2021-05-20"),
                text("TSE:SHOP"),
                text("1,234.5"),
                text("$0.25"),
                text("1,000.00$"),
                text("-$1,234,500.25"),
            ],
            &standard_indices(),
        )
        .unwrap();
        assert_eq!(record.units(), Some(Shares::new(dec!(1234.5))));
        assert_eq!(record.fees(), Some(Money::new(dec!(0.25))));
        assert_eq!(record.unit_price(), Some(Money::new(dec!(1000))));
        assert_eq!(record.net_transaction_value(), Money::new(dec!(-1234500.25)));
    }

    #[test]
    fn rejects_unknown_transaction_types() {
        let err = parse_err(vec![
            text("DIV"),
            day(2021, 5, 20),
            text("ABC"),
            Cell::Number(1.0),
            Cell::Number(0.0),
            Cell::Number(10.0),
            Cell::Number(10.0),
        ]);
        assert!(matches!(err, CellError::UnknownTransactionType(_)));
        assert!(err.to_string().contains("unknown transaction type"));
    }

    #[test]
    fn rejects_invalid_dates() {
        let err = parse_err(vec![
            text("BUY"),
            text("20/05/2021"),
            text("TSE:SHOP"),
            Cell::Number(10.0),
        ]);
        assert!(matches!(err, CellError::InvalidDate { label: "Transaction date", .. }));

        let err = parse_err(vec![text("BUY"), Cell::Number(44336.0), text("TSE:SHOP")]);
        assert!(matches!(err, CellError::InvalidDate { .. }));
    }

    #[test]
    fn accepts_date_time_text() {
        let record = parse_transaction_record(
            2,
            &[
                text("SELL"),
                text("2021-05-20 13:45:00"),
                text("X"),
                Cell::Number(1.0),
                Cell::Empty,
                Cell::Number(2.0),
            ],
            &standard_indices(),
        )
        .unwrap();
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2021, 5, 20).unwrap());
    }

    #[test]
    fn rejects_bad_tickers() {
        let err = parse_err(vec![text("BUY"), day(2021, 5, 20), Cell::Number(123.0)]);
        assert!(matches!(err, CellError::InvalidText { label: "Ticker", .. }));

        let err = parse_err(vec![text("BUY"), day(2021, 5, 20), text("   ")]);
        assert_eq!(err, CellError::EmptyText { label: "Ticker" });
    }

    #[test]
    fn rejects_non_numeric_values() {
        let err = parse_err(vec![
            text("BUY"),
            day(2021, 5, 20),
            text("TSE:SHOP"),
            text("abc"),
            Cell::Number(0.0),
            Cell::Number(151.07),
        ]);
        assert!(matches!(err, CellError::InvalidNumber { label: "Units", .. }));

        let err = parse_err(vec![
            text("BUY"),
            day(2021, 5, 20),
            text("TSE:SHOP"),
            Cell::Number(10.0),
            Cell::Number(0.0),
            Cell::Number(f64::NAN),
        ]);
        assert!(matches!(err, CellError::Value { label: "Unit price", .. }));

        let err = parse_err(vec![
            text("BUY"),
            day(2021, 5, 20),
            text("TSE:SHOP"),
            Cell::Number(10.0),
            Cell::Number(0.0),
            Cell::Number(151.07),
            Cell::Bool(true),
        ]);
        assert!(matches!(err, CellError::InvalidNumber { label: "Net transaction value", .. }));
    }

    #[test]
    fn blank_cells_are_absent() {
        let record = parse_transaction_record(
            2,
            &[
                text("ROC"),
                day(2021, 5, 20),
                text("TSE:AAA"),
                text("  "),
                Cell::Empty,
                Cell::Empty,
                text("12.5"),
            ],
            &standard_indices(),
        )
        .unwrap();
        assert!(matches!(record, TransactionRecord::NetOnly(_)));
        assert_eq!(record.fees(), None);
    }

    #[test]
    fn normalization_failures_keep_the_row() {
        let err = parse_transaction_record(
            5,
            &[text("BUY"), day(2021, 5, 20), text("TSE:AAA"), Cell::Number(3.0)],
            &standard_indices(),
        )
        .unwrap_err();
        assert_eq!(err.row(), Some(5));
        assert!(matches!(
            err,
            Error::Normalize {
                source: NormalizeError::IncompleteTransactionData { .. },
                ..
            }
        ));
    }

    #[test]
    fn parse_table_skips_blank_rows_and_numbers_physically() {
        let table = vec![
            vec![Cell::Empty, text(" ")],
            headers(&["Date", "Ticker", "Type", "Units", "Unit Price", "Fees", "Net Transaction Value"]),
            vec![day(2022, 1, 1), text("AAA"), text("BUY"), Cell::Number(1.0), Cell::Number(10.0)],
            vec![Cell::Empty; 7],
            vec![day(2022, 1, 2), text("AAA"), text("SELL"), Cell::Number(1.0), Cell::Number(12.0)],
        ];
        let records = parse_table(&table).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row(), 3);
        assert_eq!(records[1].row(), 5);
    }

    #[test]
    fn parse_table_requires_a_header() {
        assert!(matches!(parse_table(&[]), Err(Error::MissingHeader)));
    }

    #[test]
    fn reads_csv_into_cells() {
        let csv = "Date,Ticker,Type,Units,Unit Price,Fees,Net Transaction Value\n\
                   2022-01-01,AAA,BUY,10,\"$1,000.00\",,\n\
                   2022-01-02,AAA,ROC\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table[1][4], text("$1,000.00"));
        assert_eq!(table[1][5], Cell::Empty);
        assert_eq!(table[2].len(), 3);
    }

    #[test]
    fn loads_csv_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Ticker,Type,Units,Unit Price,Fees,Net Transaction Value").unwrap();
        writeln!(file, "2022-01-01,AAA,BUY,10,10,1,").unwrap();
        let table = load_table(file.path()).unwrap();
        let records = parse_table(&table).unwrap();
        assert_eq!(records[0].net_transaction_value(), Money::new(dec!(-101)));
    }
}
