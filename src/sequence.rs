//! Sequence validation
//!
//! Runs before any byte is written so an incomplete set of parts never
//! produces a joined file.

use crate::error::PartError;
use crate::types::Part;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use tracing::info;

/// Upper bound on how many missing indices a [`PartError::MissingParts`] lists
pub const MAX_REPORTED_MISSING: usize = 1000;

/// Check that `indices` cover `min..=max` exactly once each
///
/// Returns the covered range. Gaps fail with [`PartError::MissingParts`]
/// carrying the sorted missing and found indices; a repeated index fails
/// with [`PartError::DuplicateIndex`] (without file names, see
/// [`validate_parts`]). An empty slice fails with [`PartError::EmptySequence`].
///
/// At most [`MAX_REPORTED_MISSING`] missing indices are listed, the lowest
/// first; `missing_count` always holds the full number.
pub fn validate_indices(indices: &[u64]) -> Result<RangeInclusive<u64>, PartError> {
    let mut seen = BTreeSet::new();
    for &index in indices {
        if !seen.insert(index) {
            return Err(PartError::DuplicateIndex {
                index,
                names: Vec::new(),
            });
        }
    }

    let (Some(&min), Some(&max)) = (seen.first(), seen.last()) else {
        return Err(PartError::EmptySequence);
    };

    // Every index is distinct, so the set is contiguous iff it has max-min+1 members.
    let span = max - min;
    if span.checked_add(1) == Some(seen.len() as u64) {
        return Ok(min..=max);
    }

    // Walk neighbouring pairs so the cost depends on the number of parts, not the span.
    let mut missing = Vec::new();
    let mut missing_count: u64 = 0;
    for (&lo, &hi) in seen.iter().zip(seen.iter().skip(1)) {
        let gap = hi - lo - 1;
        if gap == 0 {
            continue;
        }
        missing_count = missing_count.saturating_add(gap);
        let room = MAX_REPORTED_MISSING - missing.len();
        missing.extend((lo + 1..hi).take(room));
    }

    Err(PartError::MissingParts {
        missing,
        missing_count,
        found: seen.into_iter().collect(),
    })
}

/// Validate a discovered part set
///
/// Same checks as [`validate_indices`], but a duplicate index reports every
/// file name that claimed it.
pub fn validate_parts(parts: &[Part]) -> Result<RangeInclusive<u64>, PartError> {
    let mut by_index: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    for part in parts {
        by_index.entry(part.index).or_default().push(&part.name);
    }

    if let Some((&index, names)) = by_index.iter().find(|(_, names)| names.len() > 1) {
        return Err(PartError::DuplicateIndex {
            index,
            names: names.iter().map(|n| n.to_string()).collect(),
        });
    }

    let indices: Vec<u64> = parts.iter().map(|p| p.index).collect();
    let range = validate_indices(&indices)?;

    info!(
        first = range.start(),
        last = range.end(),
        count = parts.len(),
        "part sequence is complete"
    );

    Ok(range)
}
