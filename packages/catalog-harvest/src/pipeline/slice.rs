//! Resume / limit slicing.

use std::ops::Range;

use crate::error::{ConfigError, HarvestError, Result};

/// Range of worklist indices to process.
///
/// `start_at` is 1-based; `limit` counts from the slice start, not from
/// index 0.
pub fn slice(len: usize, start_at: Option<usize>, limit: Option<usize>) -> Result<Range<usize>> {
    let start = match start_at {
        None => 0,
        Some(0) => {
            return Err(HarvestError::Config(ConfigError::Invalid {
                key: "start_at".into(),
                value: "0".into(),
                reason: "positions are 1-based".into(),
            }))
        }
        Some(s) if s > len => return Err(HarvestError::StartOutOfRange { start_at: s, len }),
        Some(s) => s - 1,
    };

    let end = match limit {
        Some(n) => start.saturating_add(n).min(len),
        None => len,
    };

    Ok(start..end)
}
