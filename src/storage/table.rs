//! CSV tables exchanged between stages
//!
//! The upstream stages write RFC 4180 CSV: comma separated, fields optionally
//! wrapped in double quotes, `""` for a literal quote, and newlines allowed
//! inside quoted fields.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("empty table: no header row")]
    MissingHeader,

    #[error("unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),

    #[error("line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Header plus rows of string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Parse CSV text. Blank lines are skipped; short rows are padded, long
    /// rows are rejected.
    pub fn parse(input: &str) -> Result<Self, TableError> {
        let mut records = parse_records(input.strip_prefix('\u{feff}').unwrap_or(input))?;
        if records.is_empty() {
            return Err(TableError::MissingHeader);
        }
        let (_, headers) = records.remove(0);
        let width = headers.len();

        let mut rows = Vec::with_capacity(records.len());
        for (line, mut row) in records {
            if row.len() > width {
                return Err(TableError::RaggedRow {
                    line,
                    expected: width,
                    found: row.len(),
                });
            }
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows,
        })
    }

    /// Render as CSV with `\n` line endings.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_row(&mut out, &self.headers);
        for row in &self.rows {
            write_row(&mut out, row);
        }
        out
    }
}

/// Split into records, each tagged with the line it starts on.
fn parse_records(input: &str) -> Result<Vec<(usize, Vec<String>)>, TableError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                field_started = true;
                quote_line = line;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if field_started || !field.is_empty() || !record.is_empty() {
                    record.push(std::mem::take(&mut field));
                    records.push((record_line, std::mem::take(&mut record)));
                }
                field_started = false;
                line += 1;
                record_line = line;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(TableError::UnterminatedQuote(quote_line));
    }
    if field_started || !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push((record_line, record));
    }
    Ok(records)
}

fn write_row(out: &mut String, row: &[String]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}
