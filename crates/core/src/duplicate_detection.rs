//! Batch-level duplicate natural key detection.
//!
//! Runs before any persistence. A batch with any repeated key is rejected as
//! a whole. No database access.

use std::collections::HashMap;

use serde::Serialize;

use crate::employee::RawEmployeeRecord;
use crate::transform::DataTransformer;

/// One natural key that occurs more than once, with every batch index it
/// occurs at (ascending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub employee_id: String,
    pub indices: Vec<usize>,
}

/// A batch contains repeated natural keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Duplicate employee IDs found: {}", describe(.duplicates))]
pub struct DuplicateRecordsFound {
    /// Ordered by first occurrence in the batch.
    pub duplicates: Vec<DuplicateKey>,
}

fn describe(duplicates: &[DuplicateKey]) -> String {
    duplicates
        .iter()
        .map(|d| {
            let indices: Vec<String> = d.indices.iter().map(usize::to_string).collect();
            format!("{} at records [{}]", d.employee_id, indices.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Group `keys` by value and report every key seen more than once.
///
/// Empty keys are ignored; such records fail required-field validation
/// instead.
pub fn find_duplicates<'a, I>(keys: I) -> Vec<DuplicateKey>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&'a str> = Vec::new();
    let mut positions: HashMap<&'a str, Vec<usize>> = HashMap::new();

    for (index, key) in keys.into_iter().enumerate() {
        if key.is_empty() {
            continue;
        }
        let entry = positions.entry(key).or_default();
        if entry.is_empty() {
            order.push(key);
        }
        entry.push(index);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let indices = positions.remove(key)?;
            (indices.len() > 1).then(|| DuplicateKey {
                employee_id: key.to_string(),
                indices,
            })
        })
        .collect()
}

/// Reject `keys` if any key repeats.
pub fn check_keys<'a, I>(keys: I) -> Result<(), DuplicateRecordsFound>
where
    I: IntoIterator<Item = &'a str>,
{
    let duplicates = find_duplicates(keys);
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(DuplicateRecordsFound { duplicates })
    }
}

/// Reject a parsed batch if any two raw records share a cleaned natural key.
pub fn check_batch(records: &[RawEmployeeRecord]) -> Result<(), DuplicateRecordsFound> {
    let keys: Vec<String> = records.iter().map(DataTransformer::natural_key).collect();
    check_keys(keys.iter().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::KEY_EMPLOYEE_ID;
    use assert_matches::assert_matches;

    fn batch(ids: &[&str]) -> Vec<RawEmployeeRecord> {
        ids.iter()
            .map(|id| RawEmployeeRecord::new().with(KEY_EMPLOYEE_ID, *id))
            .collect()
    }

    // -- find_duplicates -----------------------------------------------------

    #[test]
    fn repeated_key_reports_every_index() {
        let dups = find_duplicates(["EMP001", "EMP002", "EMP001"]);
        assert_eq!(
            dups,
            vec![DuplicateKey {
                employee_id: "EMP001".to_string(),
                indices: vec![0, 2],
            }]
        );
    }

    #[test]
    fn unique_keys_report_nothing() {
        assert!(find_duplicates(["A", "B", "C"]).is_empty());
        assert!(find_duplicates(std::iter::empty()).is_empty());
    }

    #[test]
    fn empty_keys_are_ignored() {
        assert!(find_duplicates(["", "A", ""]).is_empty());
    }

    #[test]
    fn multiple_duplicates_ordered_by_first_occurrence() {
        let dups = find_duplicates(["B", "A", "B", "A", "A"]);
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].employee_id, "B");
        assert_eq!(dups[0].indices, vec![0, 2]);
        assert_eq!(dups[1].employee_id, "A");
        assert_eq!(dups[1].indices, vec![1, 3, 4]);
    }

    // -- check_batch ---------------------------------------------------------

    #[test]
    fn batch_with_duplicate_is_rejected() {
        let err = check_batch(&batch(&["EMP001", "EMP002", "EMP001"])).unwrap_err();
        assert_eq!(err.duplicates[0].indices, vec![0, 2]);
        assert_eq!(
            err.to_string(),
            "Duplicate employee IDs found: EMP001 at records [0, 2]"
        );
    }

    #[test]
    fn batch_keys_compare_after_cleaning() {
        let result = check_batch(&batch(&["EMP001", "  EMP001 "]));
        assert_matches!(result, Err(DuplicateRecordsFound { duplicates }) if duplicates[0].indices == vec![0, 1]);
    }

    #[test]
    fn distinct_batch_passes() {
        assert_matches!(check_batch(&batch(&["EMP001", "EMP002", ""])), Ok(()));
    }
}
