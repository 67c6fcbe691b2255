use std::collections::HashSet;

use crate::aggregator::{recency_order, ResultAggregator};
use crate::model::SearchResult;

/// Small deterministic generator so every run folds the same streams.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }
}

fn random_stream(seed: u64, len: usize) -> Vec<SearchResult> {
    let mut rng = Lcg(seed);
    (0..len)
        .map(|_| {
            let folder = SearchResult::folder(format!("/vol/dir-{}", rng.next() % 40));
            match rng.next() % 4 {
                0 => folder,
                _ => folder.with_last_accessed((rng.next() % 1_000) as i64),
            }
        })
        .collect()
}

#[test]
fn aggregated_list_never_holds_duplicate_paths() {
    for seed in 1..=25 {
        let mut agg = ResultAggregator::new();
        for result in random_stream(seed, 300) {
            agg.fold(result);

            let unique: HashSet<_> = agg.items().iter().map(|item| item.path.clone()).collect();
            assert_eq!(unique.len(), agg.len(), "duplicate path with seed {seed}");
        }
    }
}

#[test]
fn aggregated_list_stays_in_recency_order() {
    for seed in 1..=25 {
        let mut agg = ResultAggregator::new();
        let stream = random_stream(seed, 300);
        let last = stream.last().cloned();
        agg.fold_all(stream);

        for pair in agg.items().windows(2) {
            assert_ne!(
                recency_order(&pair[0], &pair[1]),
                std::cmp::Ordering::Greater,
                "out of order with seed {seed}"
            );
        }

        if let Some(last) = last {
            assert_eq!(agg.find(&last.path), Some(&last));
        }
    }
}
