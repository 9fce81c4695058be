//! Work partitioner properties over a spread of inputs.

use rollmap_lib::modules::jobs::{split_by_size, split_flat, split_index_range};
use std::collections::BTreeSet;

#[test]
fn flat_split_covers_every_item_exactly_once() {
    for total in [0usize, 1, 7, 100, 1001] {
        for workers in 1..=9 {
            let splits = split_flat((0..total).collect::<Vec<_>>(), workers);
            assert_eq!(splits.len(), workers);

            let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.items.iter().copied()).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..total).collect::<Vec<_>>());

            let sizes: Vec<usize> = splits.iter().map(|s| s.len()).collect();
            let spread = sizes.iter().max().unwrap() - sizes.iter().min().unwrap();
            assert!(spread <= 1, "sizes {:?}", sizes);
        }
    }
}

#[test]
fn index_ranges_tile_the_input() {
    for total in [0usize, 5, 999] {
        for workers in 1..=6 {
            let ranges: Vec<_> = split_index_range(total, workers)
                .into_iter()
                .map(|s| s.items[0].clone())
                .collect();
            assert_eq!(ranges.first().map(|r| r.start), Some(0));
            assert_eq!(ranges.last().map(|r| r.end), Some(total));
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }
}

#[test]
fn size_split_is_complete_and_near_balanced() {
    let sizes: Vec<u64> = vec![
        512, 3, 87, 1400, 64, 64, 900, 12, 250, 777, 31, 2048, 5, 300, 301, 99,
    ];
    let items: Vec<(usize, u64)> = sizes.iter().copied().enumerate().collect();
    let total: u64 = sizes.iter().sum();
    let largest = *sizes.iter().max().unwrap();

    for workers in 1..=5 {
        let splits = split_by_size(items.clone(), workers);

        let assigned: BTreeSet<usize> = splits.iter().flat_map(|s| s.items.iter().copied()).collect();
        let count: usize = splits.iter().map(|s| s.len()).sum();
        assert_eq!(count, sizes.len());
        assert_eq!(assigned.len(), sizes.len());

        for split in &splits {
            let load: u64 = split.items.iter().map(|i| sizes[*i]).sum();
            assert_eq!(load, split.load);
        }

        // Optimum is at least the average load and at least the largest item.
        let lower_bound = (total / workers as u64).max(largest);
        let heaviest = splits.iter().map(|s| s.load).max().unwrap();
        assert!(heaviest <= lower_bound + largest);
    }
}
