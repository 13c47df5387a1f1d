//! Fixed-size grouping of upload targets.

use super::enumerate::UploadTarget;

/// Ordered group of at most `batch_size` targets.
pub type Batch = Vec<UploadTarget>;

/// Iterator adapter yielding consecutive, non-overlapping chunks of the inner iterator.
/// Every chunk has exactly `size` items except possibly the last, which is never empty.
pub struct Batches<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Batches<I> {
    /// `size` is clamped to at least 1.
    pub fn new(inner: I, size: usize) -> Self {
        Self {
            inner,
            size: size.max(1),
        }
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}

/// `iter.batched(n)` for any iterator.
pub trait Batched: Iterator + Sized {
    fn batched(self, size: usize) -> Batches<Self> {
        Batches::new(self, size)
    }
}

impl<I: Iterator> Batched for I {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_items_by_two() {
        let sizes: Vec<usize> = (0..5).batched(2).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn batch_count_and_order_preserved() {
        for total in 0..40usize {
            for size in 1..9usize {
                let batches: Vec<Vec<usize>> = (0..total).batched(size).collect();
                assert_eq!(batches.len(), total.div_ceil(size));
                if let Some((last, full)) = batches.split_last() {
                    assert!(full.iter().all(|b| b.len() == size));
                    assert!(!last.is_empty() && last.len() <= size);
                }
                let flat: Vec<usize> = batches.into_iter().flatten().collect();
                assert_eq!(flat, (0..total).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_batch() {
        let batches: Vec<_> = (0..6).batched(3).collect();
        assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn zero_size_clamped_to_one() {
        assert_eq!((0..3).batched(0).count(), 3);
    }

    #[test]
    fn batches_upload_targets() {
        let targets = ["a", "b", "c"].into_iter().map(UploadTarget::new);
        let batches: Vec<Batch> = targets.batched(2).collect();
        assert_eq!(batches[0][1].path(), std::path::Path::new("b"));
        assert_eq!(batches[1].len(), 1);
    }
}
