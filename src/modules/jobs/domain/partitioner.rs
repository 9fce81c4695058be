//! Static work partitioning, done once before any worker starts.

use super::entities::WorkSplit;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::Range;

/// Even split: item `i` counts toward worker `i mod n`, then each worker
/// receives one contiguous slice of that size. Slice sizes differ by at
/// most one and input order is preserved.
pub fn split_flat<T>(items: Vec<T>, num_workers: usize) -> Vec<WorkSplit<T>> {
    let n = num_workers.max(1);
    let total = items.len();

    let mut sizes = vec![0usize; n];
    for i in 0..total {
        sizes[i % n] += 1;
    }

    let mut splits = Vec::with_capacity(n);
    let mut remaining = items.into_iter();
    for (worker, size) in sizes.into_iter().enumerate() {
        let mut split = WorkSplit::new(worker + 1);
        split.items = remaining.by_ref().take(size).collect();
        split.load = split.items.len() as u64;
        splits.push(split);
    }
    splits
}

/// Flat split of the index range `0..total` without materializing it: one
/// contiguous range per worker, sized as in [`split_flat`].
pub fn split_index_range(total: usize, num_workers: usize) -> Vec<WorkSplit<Range<usize>>> {
    let n = num_workers.max(1);
    let base = total / n;
    let extra = total % n;

    let mut start = 0;
    (0..n)
        .map(|worker| {
            let size = base + usize::from(worker < extra);
            let mut split = WorkSplit::new(worker + 1);
            split.items.push(start..start + size);
            split.load = size as u64;
            start += size;
            split
        })
        .collect()
}

/// Greedy longest-processing-time split over `(item, cost)` pairs.
///
/// Items are taken largest first and each goes to the currently least
/// loaded worker (min-heap on `(load, worker)`, ties to the lower worker
/// id). The heaviest worker ends up within one item's cost of the optimum.
pub fn split_by_size<T>(mut items: Vec<(T, u64)>, num_workers: usize) -> Vec<WorkSplit<T>> {
    let n = num_workers.max(1);
    let mut splits: Vec<WorkSplit<T>> = (1..=n).map(WorkSplit::new).collect();

    // Stable sort keeps input order among equal sizes.
    items.sort_by(|a, b| b.1.cmp(&a.1));

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = (0..n).map(|w| Reverse((0, w))).collect();

    for (item, size) in items {
        let Some(Reverse((load, worker))) = heap.pop() else {
            break;
        };
        let split = &mut splits[worker];
        split.items.push(item);
        split.load += size;
        heap.push(Reverse((load + size, worker)));
    }

    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_split_sizes_differ_by_at_most_one() {
        let splits = split_flat((0..10).collect::<Vec<_>>(), 3);
        let sizes: Vec<usize> = splits.iter().map(|s| s.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(splits[0].items, vec![0, 1, 2, 3]);
        assert_eq!(splits[2].items, vec![7, 8, 9]);
    }

    #[test]
    fn flat_split_with_more_workers_than_items() {
        let splits = split_flat(vec!["a", "b"], 4);
        assert_eq!(splits.len(), 4);
        assert_eq!(splits.iter().filter(|s| s.is_empty()).count(), 2);
    }

    #[test]
    fn zero_workers_is_treated_as_one() {
        let splits = split_flat(vec![1, 2, 3], 0);
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].items, vec![1, 2, 3]);
    }

    #[test]
    fn index_range_split_matches_flat_sizes() {
        let splits = split_index_range(10, 3);
        let ranges: Vec<Range<usize>> = splits.iter().map(|s| s.items[0].clone()).collect();
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);

        let flat: Vec<u64> = split_flat((0..10).collect::<Vec<_>>(), 3)
            .iter()
            .map(|s| s.load)
            .collect();
        let ranged: Vec<u64> = splits.iter().map(|s| s.load).collect();
        assert_eq!(flat, ranged);
    }

    #[test]
    fn size_split_gives_largest_file_its_own_worker() {
        let files = vec![("small-a", 10), ("huge", 1000), ("small-b", 20), ("mid", 300)];
        let splits = split_by_size(files, 2);

        assert_eq!(splits[0].items, vec!["huge"]);
        assert_eq!(splits[0].load, 1000);
        assert_eq!(splits[1].items, vec!["mid", "small-b", "small-a"]);
        assert_eq!(splits[1].load, 330);
    }

    #[test]
    fn size_split_worker_ids_are_one_based() {
        let splits = split_by_size(vec![(1, 5)], 3);
        let ids: Vec<usize> = splits.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
