use crate::{Error, Result};
use core::ops::Range;

/// Breaks `items` into consecutive batches of `size` items.
///
/// The last batch holds the remainder and may be shorter; no empty trailing
/// batch is produced. An empty input yields no batches.
///
/// # Errors
///
/// Returns [`Error::InvalidBatchSize`] if `size` is zero.
///
/// # Example
///
/// ```
/// let items: Vec<u32> = (0..10).collect();
/// let batches = devkit::partition(&items, 3).unwrap();
/// assert_eq!(batches, vec![&[0, 1, 2][..], &[3, 4, 5][..], &[6, 7, 8][..], &[9][..]]);
/// ```
pub fn partition<T>(items: &[T], size: usize) -> Result<Vec<&[T]>> {
    check_batch_size(size)?;
    Ok(items.chunks(size).collect())
}

/// Returns the index ranges [`partition`] would slice `len` items into.
///
/// # Errors
///
/// Returns [`Error::InvalidBatchSize`] if `size` is zero.
pub fn batch_ranges(len: usize, size: usize) -> Result<Vec<Range<usize>>> {
    check_batch_size(size)?;
    Ok((0..len)
        .step_by(size)
        .map(|start| start..len.min(start + size))
        .collect())
}

fn check_batch_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(Error::InvalidBatchSize { size });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_splits_with_remainder() {
        let items: Vec<u32> = (0..10).collect();
        let batches = partition(&items, 3).unwrap();

        assert_eq!(
            batches,
            vec![&[0, 1, 2][..], &[3, 4, 5][..], &[6, 7, 8][..], &[9][..]]
        );
    }

    #[test]
    fn partition_exact_multiple_has_no_empty_tail() {
        let items = vec!["a"; 10];
        let batches = partition(&items, 5).unwrap();

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 5));
    }

    #[test]
    fn partition_empty() {
        let items: Vec<u8> = vec![];
        assert!(partition(&items, 100).unwrap().is_empty());
    }

    #[test]
    fn partition_rejects_zero() {
        let items = [1, 2, 3];
        assert!(matches!(
            partition(&items, 0),
            Err(Error::InvalidBatchSize { size: 0 })
        ));
        assert!(matches!(
            batch_ranges(3, 0),
            Err(Error::InvalidBatchSize { size: 0 })
        ));
    }

    #[test]
    fn partition_reconstructs_input() {
        for len in 0..40usize {
            let items: Vec<usize> = (0..len).collect();
            for size in 1..12 {
                let batches = partition(&items, size).unwrap();

                let flat: Vec<usize> = batches.concat();
                assert_eq!(flat, items, "len={len} size={size}");

                if let Some((last, rest)) = batches.split_last() {
                    assert!(rest.iter().all(|b| b.len() == size));
                    assert!((1..=size).contains(&last.len()));
                }
            }
        }
    }

    #[test]
    fn ranges_match_partition() {
        let items: Vec<u16> = (0..71).collect();
        let ranges = batch_ranges(items.len(), 7).unwrap();
        let batches = partition(&items, 7).unwrap();

        assert_eq!(ranges.len(), 11);
        assert_eq!(ranges.last(), Some(&(70..71)));
        for (range, batch) in ranges.into_iter().zip(batches) {
            assert_eq!(&items[range], batch);
        }
    }
}
