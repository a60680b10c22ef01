//! Partitioning of an item sequence into fixed-size batches.

use crate::item::Item;

/// A contiguous, borrowed slice of the collection sent in one model call.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Position of this batch in the partition, starting at 0
    pub index: usize,
    pub items: &'a [Item],
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> {
        self.items.iter().map(|item| item.full_name.as_str())
    }
}

/// Split `items` into consecutive batches of at most `size` items.
///
/// Batches cover the input exactly once, in order. A `size` of zero is
/// treated as one.
pub fn partition(items: &[Item], size: usize) -> Vec<Batch<'_>> {
    items
        .chunks(size.max(1))
        .enumerate()
        .map(|(index, items)| Batch { index, items })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(format!("o/r{i}"))).collect()
    }

    #[test]
    fn concatenated_batches_reproduce_input() {
        for n in [0usize, 1, 7, 50, 149, 150, 151, 500] {
            let all = items(n);
            for size in [1usize, 2, 3, 50, 150, 200] {
                let batches = partition(&all, size);
                let rebuilt: Vec<Item> = batches
                    .iter()
                    .flat_map(|b| b.items.iter().cloned())
                    .collect();
                assert_eq!(rebuilt, all, "n={n} size={size}");
                assert!(batches.iter().all(|b| b.len() <= size && !b.is_empty()));
                assert_eq!(batches.len(), n.div_ceil(size));
            }
        }
    }

    #[test]
    fn batch_indices_are_sequential() {
        let all = items(10);
        let batches = partition(&all, 3);
        let indices: Vec<usize> = batches.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(batches[3].names().collect::<Vec<_>>(), vec!["o/r9"]);
    }

    #[test]
    fn zero_size_is_treated_as_one() {
        let all = items(3);
        assert_eq!(partition(&all, 0).len(), 3);
    }
}
