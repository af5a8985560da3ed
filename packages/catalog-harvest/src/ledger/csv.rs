//! Minimal CSV reading and writing (quotes + CRLF tolerant).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::mem::take;
use std::path::Path;
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};
use crate::types::{cell_text, Record};

const SEP: char = ',';

/// Split CSV text into rows of cells.
///
/// Quoted cells may hold separators, line breaks and `""` escapes. Rows that
/// are a single empty cell (blank lines) are not returned.
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    loop {
        let next = chars.next();
        let row_done = match next {
            Some('"') if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                cell.push('"');
                false
            }
            Some('"') => {
                quoted = !quoted;
                false
            }
            Some(c) if quoted => {
                cell.push(c);
                false
            }
            Some(SEP) => {
                row.push(take(&mut cell));
                false
            }
            Some('\r') => {
                chars.next_if_eq(&'\n');
                true
            }
            Some('\n') | None => true,
            Some(c) => {
                cell.push(c);
                false
            }
        };

        if row_done {
            row.push(take(&mut cell));
            let done = take(&mut row);
            if done.len() > 1 || done.first().is_some_and(|c| !c.is_empty()) {
                rows.push(done);
            }
            if next.is_none() {
                return rows;
            }
        }
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", SEP)?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Union of record keys in first-seen order.
pub fn header_for(records: &[Record]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.iter().any(|h| h == key) {
                header.push(key.clone());
            }
        }
    }
    header
}

fn row_for(header: &[String], record: &Record) -> Vec<String> {
    header
        .iter()
        .map(|key| record.get(key).map(cell_text).unwrap_or_default())
        .collect()
}

/// Render a full CSV document (header + rows).
pub fn render(header: &[String], records: &[Record]) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_row(&mut buf, header)?;
    for record in records {
        write_row(&mut buf, &row_for(header, record))?;
    }
    Ok(buf)
}

/// Read a CSV ledger into records keyed by its header row.
pub fn read(path: &Path) -> LedgerResult<Vec<Record>> {
    let text = fs::read_to_string(path).map_err(|e| LedgerError::io(path, e))?;
    let mut rows = parse_rows(&text).into_iter();

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    Ok(rows
        .map(|row| {
            header
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    let cell = row.get(i).cloned().unwrap_or_default();
                    (key.clone(), serde_json::Value::String(cell))
                })
                .collect()
        })
        .collect())
}

/// Header of an existing ledger, if it has one.
pub(crate) fn existing_header(path: &Path) -> LedgerResult<Option<(Vec<String>, bool)>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LedgerError::io(path, e)),
    };

    let ends_with_newline = text.ends_with('\n') || text.ends_with('\r');
    Ok(parse_rows(&text)
        .into_iter()
        .next()
        .map(|header| (header, ends_with_newline)))
}

/// Append records under the existing header (no header re-emitted).
///
/// Fields missing from the existing header are dropped with a warning; an
/// absent or empty ledger gets a fresh header.
pub fn append(path: &Path, records: &[Record]) -> LedgerResult<()> {
    let (header, needs_header, needs_newline) = match existing_header(path)? {
        Some((header, ends_with_newline)) => (header, false, !ends_with_newline),
        None => (header_for(records), true, false),
    };

    let dropped: Vec<String> = header_for(records)
        .into_iter()
        .filter(|key| !header.contains(key))
        .collect();
    if !dropped.is_empty() {
        warn!(
            path = %path.display(),
            fields = ?dropped,
            "Fields not in the existing CSV header are dropped"
        );
    }

    let mut buf = Vec::new();
    let io_err = |e| LedgerError::io(path, e);
    if needs_newline {
        writeln!(buf).map_err(io_err)?;
    }
    if needs_header {
        write_row(&mut buf, &header).map_err(io_err)?;
    }
    for record in records {
        write_row(&mut buf, &row_for(&header, record)).map_err(io_err)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(&buf).map_err(io_err)?;
    file.flush().map_err(io_err)
}
