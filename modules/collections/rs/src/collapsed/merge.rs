use eyre::Result;

use probekit_core_rs::loc::{sort_paired, PackedInterval};

use super::collapsed::{collapse_inplace, CollapsedReads};

/// Merge several collapsed read sets into one, summing counts of identical reads.
///
/// All runs are flattened into a single pair of arrays, sorted together and collapsed in a single
/// linear pass. This is considerably faster than hashing reads at the scale of whole datasets.
pub fn merge<'a>(inputs: impl IntoIterator<Item = &'a CollapsedReads>) -> Result<CollapsedReads> {
    let inputs: Vec<_> = inputs.into_iter().collect();
    match inputs.len() {
        0 => return Ok(CollapsedReads::default()),
        1 => return Ok(inputs[0].clone()),
        _ => {}
    }

    let total: usize = inputs.iter().map(|x| x.len()).sum();
    let mut values: Vec<PackedInterval> = Vec::with_capacity(total);
    let mut weights: Vec<u32> = Vec::with_capacity(total);
    for collapsed in &inputs {
        values.extend_from_slice(collapsed.positions());
        weights.extend_from_slice(collapsed.counts());
    }

    sort_paired(&mut values, &mut weights)?;

    let mut counts = Vec::with_capacity(values.len());
    collapse_inplace(&mut values, Some(&weights), &mut counts)?;
    log::debug!(
        "Merged {} collapsed read sets: {} runs -> {} runs",
        inputs.len(),
        total,
        values.len()
    );

    Ok(CollapsedReads::builder()
        .with_rle_values(values, counts)?
        .build())
}
