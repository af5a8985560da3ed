//! Output ledger: the durable record store of a run.
//!
//! The format follows the file extension (`.json` array or `.csv` table).
//! Overwrite replaces the file; append never drops what is already there.
//! Whole-file writes go through a sibling temp file and a rename so an
//! interrupted write leaves the previous ledger intact.

pub mod csv;
pub mod json;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::types::Record;

/// On-disk representation of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFormat {
    Json,
    Csv,
}

impl LedgerFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> LedgerResult<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(LedgerFormat::Json),
            Some("csv") => Ok(LedgerFormat::Csv),
            _ => Err(LedgerError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// A ledger file.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    format: LedgerFormat,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let path = path.into();
        let format = LedgerFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> LedgerFormat {
        self.format
    }

    /// Persist `records` in order, appending or overwriting.
    ///
    /// Returns the number of records written by this call.
    pub fn write(&self, records: &[Record], append: bool) -> LedgerResult<usize> {
        match (self.format, append) {
            (LedgerFormat::Json, append) => {
                let existing = if append {
                    json::read_values(&self.path)?
                } else {
                    Vec::new()
                };
                let kept = existing.len();
                let bytes = json::render(existing, records)?;
                write_atomic(&self.path, &bytes)?;
                info!(
                    path = %self.path.display(),
                    written = records.len(),
                    total = kept + records.len(),
                    append,
                    "Ledger saved"
                );
            }
            (LedgerFormat::Csv, true) => {
                csv::append(&self.path, records)?;
                info!(path = %self.path.display(), written = records.len(), "Ledger appended");
            }
            (LedgerFormat::Csv, false) => {
                let header = csv::header_for(records);
                let bytes =
                    csv::render(&header, records).map_err(|e| LedgerError::io(&self.path, e))?;
                write_atomic(&self.path, &bytes)?;
                info!(path = %self.path.display(), written = records.len(), "Ledger saved");
            }
        }
        Ok(records.len())
    }

    /// Check, before any work is paid for, that a later [`write`](Self::write)
    /// can succeed: in append mode the existing contents must be readable,
    /// and the target must be writable in either mode.
    pub fn preflight(&self, append: bool) -> LedgerResult<()> {
        if append {
            match self.format {
                LedgerFormat::Json => {
                    json::read_values(&self.path)?;
                }
                LedgerFormat::Csv => {
                    csv::existing_header(&self.path)?;
                }
            }
        }

        if self.path.exists() {
            fs::OpenOptions::new()
                .append(true)
                .open(&self.path)
                .map_err(|e| LedgerError::io(&self.path, e))?;
        } else {
            let tmp = sibling(&self.path, "tmp");
            fs::write(&tmp, b"").map_err(|e| LedgerError::io(&tmp, e))?;
            fs::remove_file(&tmp).map_err(|e| LedgerError::io(&tmp, e))?;
        }

        debug!(path = %self.path.display(), append, "Ledger is writable");
        Ok(())
    }

    /// Dump `records` as a JSON array next to the ledger, for when the ledger
    /// itself could not be written. Returns the file written.
    pub fn save_unsaved(&self, records: &[Record]) -> LedgerResult<PathBuf> {
        let path = sibling(&self.path, "unsaved.json");
        let bytes = json::render(Vec::new(), records)?;
        fs::write(&path, bytes).map_err(|e| LedgerError::io(&path, e))?;
        Ok(path)
    }

    /// Read every record currently in the ledger.
    pub fn read(&self) -> LedgerResult<Vec<Record>> {
        match self.format {
            LedgerFormat::Json => json::read(&self.path),
            LedgerFormat::Csv => csv::read(&self.path),
        }
    }
}

/// Read records from a ledger file of either format.
pub fn read_records(path: &Path) -> LedgerResult<Vec<Record>> {
    Ledger::new(path)?.read()
}

/// Append raw lines to a plain-text file (failed-input log).
pub fn append_text(path: &Path, text: &str) -> LedgerResult<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LedgerError::io(path, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| LedgerError::io(path, e))
}

/// Hidden file beside `path`: `dir/.{name}.{suffix}`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ledger".to_string());
    path.with_file_name(format!(".{}.{}", file_name, suffix))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> LedgerResult<()> {
    let tmp = sibling(path, "tmp");

    fs::write(&tmp, bytes).map_err(|e| LedgerError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| LedgerError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn course(n: u32) -> Record {
        let mut record = Record::new();
        record.insert("course_number".into(), json!(format!("ACCT {}", n)));
        record.insert("title".into(), json!(format!("Course {}", n)));
        record
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(LedgerFormat::from_path(Path::new("a.JSON")).unwrap(), LedgerFormat::Json);
        assert_eq!(LedgerFormat::from_path(Path::new("a.csv")).unwrap(), LedgerFormat::Csv);
        assert!(LedgerFormat::from_path(Path::new("a.txt")).is_err());
        assert!(LedgerFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_json_append_preserves_existing_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("out.json")).unwrap();

        ledger.write(&[course(1), course(2), course(3)], false).unwrap();
        ledger.write(&[course(4), course(5)], true).unwrap();

        let records = ledger.read().unwrap();
        let numbers: Vec<_> = records.iter().map(|r| r["course_number"].clone()).collect();
        assert_eq!(
            numbers,
            vec!["ACCT 1", "ACCT 2", "ACCT 3", "ACCT 4", "ACCT 5"]
        );
    }

    #[test]
    fn test_json_overwrite_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("out.json")).unwrap();

        ledger.write(&[course(1), course(2)], false).unwrap();
        ledger.write(&[course(9)], false).unwrap();

        assert_eq!(ledger.read().unwrap(), vec![course(9)]);
    }

    #[test]
    fn test_json_append_refuses_corrupt_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "not json at all").unwrap();

        let ledger = Ledger::new(&path).unwrap();
        assert!(matches!(
            ledger.write(&[course(1)], true),
            Err(LedgerError::Corrupt { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "not json at all");
    }

    #[test]
    fn test_csv_overwrite_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("out.csv")).unwrap();

        ledger.write(&[course(1)], false).unwrap();
        ledger.write(&[course(2)], true).unwrap();

        let text = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(text, "course_number,title\nACCT 1,Course 1\nACCT 2,Course 2\n");
        assert_eq!(ledger.read().unwrap().len(), 2);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("out.json")).unwrap();
        ledger.write(&[course(1)], false).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["out.json"]);
    }

    #[test]
    fn test_preflight_rejects_corrupt_append_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "{ truncated").unwrap();
        let ledger = Ledger::new(&path).unwrap();

        assert!(matches!(ledger.preflight(true), Err(LedgerError::Corrupt { .. })));
        // Overwrite mode does not care what is there now
        assert!(ledger.preflight(false).is_ok());
    }

    #[test]
    fn test_preflight_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("no/such/dir/out.csv")).unwrap();

        assert!(matches!(ledger.preflight(false), Err(LedgerError::Io { .. })));
    }

    #[test]
    fn test_preflight_leaves_directory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("out.csv")).unwrap();

        ledger.preflight(true).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_unsaved_writes_sibling_json() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join("courses.csv")).unwrap();

        let path = ledger.save_unsaved(&[course(1), course(2)]).unwrap();

        assert_eq!(path, dir.path().join(".courses.csv.unsaved.json"));
        assert_eq!(json::read(&path).unwrap(), vec![course(1), course(2)]);
    }

    #[test]
    fn test_append_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed.log");
        append_text(&path, "one\n").unwrap();
        append_text(&path, "two\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }
}
