//! Round-robin assignment of dataset items to annotators.
//!
//! Item `i` belongs to annotator `i mod k`. Views keep dataset order.

use std::collections::BTreeMap;

use shared::domain::{AnnotatorId, Item};

use crate::error::{AnnotationError, Result};

pub fn assign(item_index: usize, num_annotators: i64) -> Result<AnnotatorId> {
    let modulus = checked_annotator_count(num_annotators)?;
    Ok(AnnotatorId((item_index as u64 % modulus) as i64))
}

/// Splits `items` into one ordered view per annotator. Every annotator id in
/// `0..num_annotators` is present, even when its view is empty.
pub fn partition<'a>(
    items: &'a [Item],
    num_annotators: i64,
) -> Result<BTreeMap<AnnotatorId, Vec<&'a Item>>> {
    checked_annotator_count(num_annotators)?;
    let mut views: BTreeMap<AnnotatorId, Vec<&Item>> = (0..num_annotators)
        .map(|annotator| (AnnotatorId(annotator), Vec::new()))
        .collect();
    for (index, item) in items.iter().enumerate() {
        let annotator = assign(index, num_annotators)?;
        views.entry(annotator).or_default().push(item);
    }
    Ok(views)
}

/// The single view for `annotator`, without materialising the others.
pub fn view_for<'a>(
    items: &'a [Item],
    annotator: AnnotatorId,
    num_annotators: i64,
) -> Result<Vec<&'a Item>> {
    ensure_annotator(annotator, num_annotators)?;
    let modulus = checked_annotator_count(num_annotators)?;
    Ok(items
        .iter()
        .enumerate()
        .filter(|(index, _)| (*index as u64 % modulus) as i64 == annotator.0)
        .map(|(_, item)| item)
        .collect())
}

pub fn ensure_annotator(annotator: AnnotatorId, num_annotators: i64) -> Result<()> {
    checked_annotator_count(num_annotators)?;
    if annotator.0 < 0 || annotator.0 >= num_annotators {
        return Err(AnnotationError::UnknownAnnotator {
            annotator_id: annotator,
            num_annotators,
        });
    }
    Ok(())
}

fn checked_annotator_count(num_annotators: i64) -> Result<u64> {
    if num_annotators <= 0 {
        return Err(AnnotationError::Configuration(format!(
            "num_annotators must be positive, got {num_annotators}"
        )));
    }
    Ok(num_annotators as u64)
}

#[cfg(test)]
#[path = "tests/partition_tests.rs"]
mod tests;
