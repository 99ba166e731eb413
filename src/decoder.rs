use std::path::Path;

use regex::Regex;

use crate::balances::reconstruct_balances;
use crate::error::{PfennigError, Result};
use crate::format::FormatSpec;
use crate::models::{Column, Transaction};

/// Reads a statement file and decodes it with the given format.
pub fn decode_file(path: &Path, spec: &FormatSpec) -> Result<Vec<Transaction>> {
    let raw = std::fs::read(path)?;
    decode(&raw, spec)
}

/// Decodes raw statement bytes into canonical records.
///
/// The body is parsed with the format's dialect, each mapped column is
/// converted to its canonical type, the balance anchor is extracted from the
/// raw text, and the running balance is reconstructed from it. Row order is
/// the file's native order (newest first for the supported formats). Every
/// mismatch between file and format surfaces as a `Format` error.
pub fn decode(raw: &[u8], spec: &FormatSpec) -> Result<Vec<Transaction>> {
    // The whole file lives in memory so the body parse and the anchor scan
    // can read the same content independently.
    let content = spec.encoding.decode(raw)?;

    let body = read_body(&content, spec)?;
    let final_balance = read_total_balance(&content, spec)?;

    build_records(body, final_balance, spec)
}

/// Raw text cells of the mapped columns, in source row order.
struct RawBody {
    /// One entry per mapped canonical column: (column, source name, cells).
    columns: Vec<(Column, String, Vec<String>)>,
    rows: usize,
}

fn format_err(context: &str, e: impl std::fmt::Display) -> PfennigError {
    PfennigError::Format(format!("{context}: {e}"))
}

/// Parses the tabular body: skips the configured preamble, matches the header
/// against the mapped source columns and collects every mapped cell as raw
/// text. No type coercion happens here.
fn read_body(content: &str, spec: &FormatSpec) -> Result<RawBody> {
    let mut lines = content.lines();
    for _ in 0..spec.skip_lines {
        if lines.next().is_none() {
            return Err(PfennigError::Format(format!(
                "file ends before the {} configured header lines",
                spec.skip_lines
            )));
        }
    }
    let body: String = lines.collect::<Vec<_>>().join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(spec.dialect.delimiter)
        .quote(spec.dialect.quote)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format_err("could not read header row", e))?
        .clone();

    // Resolve each mapped canonical column to a header position.
    let mut columns: Vec<(Column, String, usize, Vec<String>)> = Vec::new();
    for column in Column::ALL {
        if let Some(source) = spec.source_column(column) {
            let index = headers
                .iter()
                .position(|h| h.trim() == source)
                .ok_or_else(|| {
                    PfennigError::Format(format!(
                        "source column '{source}' not found in file header"
                    ))
                })?;
            columns.push((column, source.to_string(), index, Vec::new()));
        }
    }

    let mut rows = 0;
    for record in reader.records() {
        let record = record.map_err(|e| format_err("malformed csv body", e))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        for (_, source, index, cells) in columns.iter_mut() {
            let cell = record.get(*index).ok_or_else(|| {
                PfennigError::Format(format!(
                    "row {} has no value for source column '{}'",
                    rows + 1,
                    source
                ))
            })?;
            cells.push(cell.to_string());
        }
        rows += 1;
    }

    Ok(RawBody {
        columns: columns
            .into_iter()
            .map(|(column, source, _, cells)| (column, source, cells))
            .collect(),
        rows,
    })
}

/// Scans the raw content line by line for the balance anchor pattern and
/// converts the first capture to a number. This deliberately ignores the
/// tabular structure; the anchor usually lives in the free-text preamble.
fn read_total_balance(content: &str, spec: &FormatSpec) -> Result<f64> {
    let pattern = Regex::new(&spec.balance_pattern)
        .map_err(|e| format_err("invalid balance pattern", e))?;

    for line in content.lines() {
        if let Some(captures) = pattern.captures(line) {
            let matched = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str())
                .unwrap_or_default();
            return (spec.balance_converter)(matched).ok_or_else(|| {
                PfennigError::Format(format!(
                    "matched balance '{matched}' is not a number"
                ))
            });
        }
    }

    Err(PfennigError::Format(
        "total balance not found in file".to_string(),
    ))
}

/// Converts the raw cells column by column, in the fixed canonical order, and
/// assembles the record set with the reconstructed balance column.
fn build_records(body: RawBody, final_balance: f64, spec: &FormatSpec) -> Result<Vec<Transaction>> {
    let rows = body.rows;

    let mut dates: Vec<chrono::NaiveDate> = Vec::new();
    let mut texts: Vec<String> = Vec::new();
    let mut amounts: Vec<f64> = Vec::new();
    let mut sender_accounts = vec![None; rows];
    let mut receiver_accounts = vec![None; rows];
    let mut currencies = vec![None; rows];
    let mut categories = vec![None; rows];
    let mut tags = vec![None; rows];
    let mut origins = vec![None; rows];

    for (column, source, cells) in &body.columns {
        match column {
            Column::Date => {
                dates = convert_dates(cells, source, spec)?;
            }
            Column::Text => {
                texts = cells.iter().map(|c| (spec.text_converter())(c)).collect();
            }
            Column::Amount => {
                amounts = convert_numbers(cells, source, spec)?;
            }
            Column::SenderAccount => sender_accounts = convert_optional_texts(cells, spec),
            Column::ReceiverAccount => receiver_accounts = convert_optional_texts(cells, spec),
            Column::Currency => currencies = convert_optional_texts(cells, spec),
            Column::Category => categories = convert_optional_texts(cells, spec),
            Column::Tags => tags = convert_optional_texts(cells, spec),
            Column::Origin => origins = convert_optional_texts(cells, spec),
            Column::TotalBalance | Column::Id => {}
        }
    }

    let balances = reconstruct_balances(&amounts, final_balance);

    let mut records = Vec::with_capacity(rows);
    for i in 0..rows {
        records.push(Transaction {
            date: dates[i],
            sender_account: sender_accounts[i].take(),
            receiver_account: receiver_accounts[i].take(),
            text: texts[i].clone(),
            amount: amounts[i],
            total_balance: balances[i],
            currency: currencies[i].take(),
            category: categories[i].take(),
            tags: tags[i].take(),
            origin: origins[i].take(),
            id: None,
        });
    }
    Ok(records)
}

fn convert_dates(
    cells: &[String],
    source: &str,
    spec: &FormatSpec,
) -> Result<Vec<chrono::NaiveDate>> {
    cells
        .iter()
        .map(|cell| {
            (spec.date_converter())(cell).ok_or_else(|| {
                PfennigError::Format(format!(
                    "could not convert '{cell}' in column '{source}' to a date"
                ))
            })
        })
        .collect()
}

fn convert_numbers(cells: &[String], source: &str, spec: &FormatSpec) -> Result<Vec<f64>> {
    cells
        .iter()
        .map(|cell| {
            (spec.number_converter())(cell).ok_or_else(|| {
                PfennigError::Format(format!(
                    "could not convert '{cell}' in column '{source}' to a number"
                ))
            })
        })
        .collect()
}

fn convert_optional_texts(cells: &[String], spec: &FormatSpec) -> Vec<Option<String>> {
    cells
        .iter()
        .map(|cell| {
            let text = (spec.text_converter())(cell);
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        })
        .collect()
}
