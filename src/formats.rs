use chrono::NaiveDate;

use crate::error::Result;
use crate::format::{Converter, Dialect, Encoding, FormatSpec};
use crate::models::Column;

// ---------------------------------------------------------------------------
// DKB conversion helpers
// ---------------------------------------------------------------------------

const DKB_DIALECT: Dialect = Dialect {
    delimiter: b';',
    quote: b'"',
};

fn dkb_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y").ok()
}

fn dkb_text(raw: &str) -> String {
    raw.trim().to_string()
}

/// German number format: thousands dots, decimal comma ("1.248,54").
fn dkb_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    cleaned.parse().ok()
}

/// The VISA header balance is already a plain dotted float.
fn plain_number(raw: &str) -> Option<f64> {
    raw.trim().parse().ok()
}

fn dkb_converters() -> [Converter; 3] {
    [
        Converter::Date(dkb_date),
        Converter::Text(dkb_text),
        Converter::Number(dkb_number),
    ]
}

// ---------------------------------------------------------------------------
// Format registry — enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

/// The supported source file formats. The caller selects one by key; there is
/// no auto-detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CsvFormat {
    DkbCash,
    DkbVisa,
}

pub const ALL_FORMATS: &[CsvFormat] = &[CsvFormat::DkbCash, CsvFormat::DkbVisa];

impl CsvFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::DkbCash => "dkb-cash",
            Self::DkbVisa => "dkb-visa",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DkbCash => "DKB Girokonto (cash) export",
            Self::DkbVisa => "DKB Visa export",
        }
    }

    pub fn from_key(key: &str) -> Option<CsvFormat> {
        ALL_FORMATS.iter().find(|f| f.key() == key).copied()
    }

    /// Builds the immutable format descriptor for this format.
    pub fn spec(&self) -> Result<FormatSpec> {
        match self {
            Self::DkbCash => FormatSpec::new(
                DKB_DIALECT,
                6,
                Encoding::Latin1,
                &[
                    (Column::Date, "Wertstellung"),
                    (Column::SenderAccount, "Kontonummer"),
                    (Column::Text, "Verwendungszweck"),
                    (Column::Amount, "Betrag (EUR)"),
                ],
                &dkb_converters(),
                r#""Kontostand vom \d{2}\.\d{2}\.\d{4}:";"([0-9.,-]+) EUR";"#,
                dkb_number,
            ),
            Self::DkbVisa => FormatSpec::new(
                DKB_DIALECT,
                6,
                Encoding::Latin1,
                &[
                    (Column::Date, "Wertstellung"),
                    (Column::Text, "Beschreibung"),
                    (Column::Amount, "Betrag (EUR)"),
                ],
                &dkb_converters(),
                r#""Saldo:";"([0-9.-]+) EUR";"#,
                plain_number,
            ),
        }
    }
}
