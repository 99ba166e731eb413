use chrono::NaiveDate;

use crate::error::{PfennigError, Result};
use crate::models::{Column, ColumnType};

pub type DateFn = fn(&str) -> Option<NaiveDate>;
pub type TextFn = fn(&str) -> String;
pub type NumberFn = fn(&str) -> Option<f64>;

/// A string-to-value conversion function, tagged with the canonical column
/// type it produces. The set of types is closed; a format registers exactly
/// one converter per type.
#[derive(Clone, Copy)]
pub enum Converter {
    Date(DateFn),
    Text(TextFn),
    Number(NumberFn),
}

/// Text encoding of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    /// ISO-8859-1 family; decoded as windows-1252, its WHATWG superset.
    Latin1,
}

impl Encoding {
    pub fn decode(&self, raw: &[u8]) -> Result<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(raw)
                .map(str::to_string)
                .map_err(|e| PfennigError::Format(format!("file is not valid UTF-8: {e}"))),
            Self::Latin1 => {
                let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(raw);
                if had_errors {
                    return Err(PfennigError::Format(
                        "file is not valid Latin-1".to_string(),
                    ));
                }
                Ok(text.into_owned())
            }
        }
    }
}

/// Low-level syntax of the delimited body.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
}

/// Immutable description of one source file layout: body syntax, header
/// offset, source-to-canonical column mapping, per-type converters and the
/// pattern locating the balance anchor in the surrounding free text.
///
/// Constructed once per supported format and shared read-only across decodes.
#[derive(Debug)]
pub struct FormatSpec {
    pub dialect: Dialect,
    /// Preamble lines before the header row of the tabular body.
    pub skip_lines: usize,
    pub encoding: Encoding,
    column_map: Vec<(Column, String)>,
    date_converter: DateFn,
    text_converter: TextFn,
    number_converter: NumberFn,
    /// Matched line by line against the raw text; capture group 1 (or the
    /// whole match) is handed to `balance_converter`. Compiled lazily, so a
    /// malformed pattern only surfaces on use.
    pub balance_pattern: String,
    pub balance_converter: NumberFn,
}

impl FormatSpec {
    pub fn new(
        dialect: Dialect,
        skip_lines: usize,
        encoding: Encoding,
        column_map: &[(Column, &str)],
        converters: &[Converter],
        balance_pattern: &str,
        balance_converter: NumberFn,
    ) -> Result<FormatSpec> {
        let mut date_converter = None;
        let mut text_converter = None;
        let mut number_converter = None;
        for converter in converters {
            match converter {
                Converter::Date(f) => date_converter = Some(*f),
                Converter::Text(f) => text_converter = Some(*f),
                Converter::Number(f) => number_converter = Some(*f),
            }
        }

        // Every canonical column type must have a converter before the
        // descriptor exists at all; this is the only eager validation besides
        // the required-column check below.
        for column_type in ColumnType::ALL {
            let covered = match column_type {
                ColumnType::Date => date_converter.is_some(),
                ColumnType::Text => text_converter.is_some(),
                ColumnType::Number => number_converter.is_some(),
            };
            if !covered {
                return Err(PfennigError::Config(format!(
                    "no converter registered for column type '{}'",
                    column_type.name()
                )));
            }
        }

        for (column, _) in column_map {
            if !column.is_mappable() {
                return Err(PfennigError::Config(format!(
                    "column '{}' is derived and cannot be mapped from a source column",
                    column.name()
                )));
            }
        }
        for column in Column::ALL {
            if column.is_required() && !column_map.iter().any(|(c, _)| *c == column) {
                return Err(PfennigError::Config(format!(
                    "required column '{}' has no source column mapping",
                    column.name()
                )));
            }
        }

        Ok(FormatSpec {
            dialect,
            skip_lines,
            encoding,
            column_map: column_map
                .iter()
                .map(|(c, s)| (*c, s.to_string()))
                .collect(),
            date_converter: date_converter.unwrap_or(|_| None),
            text_converter: text_converter.unwrap_or(|s| s.to_string()),
            number_converter: number_converter.unwrap_or(|_| None),
            balance_pattern: balance_pattern.to_string(),
            balance_converter,
        })
    }

    /// The source column a canonical column is read from, if any.
    pub fn source_column(&self, column: Column) -> Option<&str> {
        self.column_map
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, s)| s.as_str())
    }

    pub fn date_converter(&self) -> DateFn {
        self.date_converter
    }

    pub fn text_converter(&self) -> TextFn {
        self.text_converter
    }

    pub fn number_converter(&self) -> NumberFn {
        self.number_converter
    }
}
