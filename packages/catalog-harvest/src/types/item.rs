//! Work items discovered by the worklist builder.

use crate::types::record::Record;

/// One unit of work: an identifier (normally a URL) plus, for ledger-backed
/// runs, the payload text and the record the extraction is merged into.
///
/// Web-backed items carry no payload; the driver fetches it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Identifier, normally an absolute URL
    pub url: String,

    /// Raw text already known at discovery time
    pub payload: Option<String>,

    /// Existing record the extraction output is flattened into
    pub base: Option<Record>,
}

impl WorkItem {
    /// Create an item that must be fetched.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            payload: None,
            base: None,
        }
    }

    /// Create an item whose payload comes from an existing record.
    pub fn from_record(id: impl Into<String>, payload: impl Into<String>, base: Record) -> Self {
        Self {
            url: id.into(),
            payload: Some(payload.into()),
            base: Some(base),
        }
    }

    /// Whether the driver needs to fetch the item before extracting.
    pub fn needs_fetch(&self) -> bool {
        self.payload.is_none()
    }
}
