//! Greedy weighted distribution of specs across workers.

use specshard_core::{WeightTable, WorkerBucket};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::weights::{resolve_weight, SuffixRule};

/// Weight given to specs absent from the weight table.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Splits a spec list into per-worker buckets of roughly equal weight.
#[derive(Debug, Clone)]
pub struct Distributor {
    table: WeightTable,
    default_weight: f64,
    suffix_rule: SuffixRule,
}

impl Default for Distributor {
    fn default() -> Self {
        Self::new(WeightTable::new())
    }
}

impl Distributor {
    /// Create a distributor over a weight table.
    pub fn new(table: WeightTable) -> Self {
        Self {
            table,
            default_weight: DEFAULT_WEIGHT,
            suffix_rule: SuffixRule::default(),
        }
    }

    /// Set the weight of unknown specs.
    pub fn with_default_weight(mut self, weight: f64) -> Self {
        self.default_weight = weight;
        self
    }

    /// Set how overlapping weight keys are resolved.
    pub fn with_suffix_rule(mut self, rule: SuffixRule) -> Self {
        self.suffix_rule = rule;
        self
    }

    /// The weight table in use.
    pub fn table(&self) -> &WeightTable {
        &self.table
    }

    /// Pair each spec with its resolved weight, in input order.
    pub fn resolve_weights(&self, specs: &[PathBuf]) -> Vec<(PathBuf, f64)> {
        specs
            .iter()
            .map(|spec| {
                let weight = resolve_weight(
                    &spec.to_string_lossy(),
                    &self.table,
                    self.default_weight,
                    self.suffix_rule,
                );
                (spec.clone(), weight)
            })
            .collect()
    }

    /// Distribute specs over at most `workers` buckets.
    ///
    /// Specs are taken heaviest first and each goes to the currently
    /// lightest bucket. Ties keep discovery order for specs and current
    /// position for buckets. The result is sorted by descending weight and
    /// never holds more buckets than specs.
    pub fn distribute(&self, specs: &[PathBuf], workers: usize) -> Vec<WorkerBucket> {
        if specs.is_empty() {
            debug!("No specs to distribute");
            return Vec::new();
        }

        let count = workers.clamp(1, specs.len());
        let mut weighted = self.resolve_weights(specs);
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut buckets = vec![WorkerBucket::new(); count];
        for (spec, weight) in weighted {
            buckets.sort_by(|a, b| a.weight.total_cmp(&b.weight));
            debug!("Assigning {} (weight {}) to bucket at weight {}", spec.display(), weight, buckets[0].weight);
            buckets[0].assign(spec, weight);
        }
        buckets.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        info!(
            "Distributed {} spec(s) across {} worker(s): {}",
            specs.len(),
            buckets.len(),
            buckets
                .iter()
                .map(|b| b.weight.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specshard_core::WeightEntry;
    use std::collections::HashSet;

    fn specs(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_distribute_example() {
        let table = WeightTable::new()
            .with("a.feature", WeightEntry::weighted(10.0))
            .with("b.feature", WeightEntry::weighted(1.0));
        let distributor = Distributor::new(table).with_default_weight(5.0);

        let buckets = distributor.distribute(&specs(&["a.feature", "b.feature", "c.feature"]), 2);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].weight, 10.0);
        assert_eq!(buckets[0].list, specs(&["a.feature"]));
        assert_eq!(buckets[1].weight, 6.0);
        assert_eq!(buckets[1].list, specs(&["c.feature", "b.feature"]));
    }

    #[test]
    fn test_empty_input_gives_no_buckets() {
        assert!(Distributor::default().distribute(&[], 4).is_empty());
    }

    #[test]
    fn test_bucket_count_is_clamped() {
        let all = specs(&["a.feature", "b.feature"]);
        assert_eq!(Distributor::default().distribute(&all, 10).len(), 2);
        assert_eq!(Distributor::default().distribute(&all, 0).len(), 1);
        assert_eq!(Distributor::default().distribute(&all, 1)[0].list, all);
    }

    #[test]
    fn test_equal_weights_keep_discovery_order() {
        let all = specs(&["1.feature", "2.feature", "3.feature", "4.feature"]);
        let buckets = Distributor::default().distribute(&all, 2);
        assert_eq!(buckets[0].list, specs(&["1.feature", "4.feature"]));
        assert_eq!(buckets[1].list, specs(&["2.feature", "3.feature"]));
    }

    #[test]
    fn test_resolve_weights_uses_suffix_rule() {
        let table = WeightTable::new()
            .with("auth/login.feature", WeightEntry::weighted(20.0))
            .with("login.feature", WeightEntry::weighted(2.0));
        let all = specs(&["e2e/auth/login.feature", "e2e/login.feature"]);

        let longest = Distributor::new(table.clone()).resolve_weights(&all);
        assert_eq!(longest[0].1, 20.0);
        assert_eq!(longest[1].1, 2.0);

        let last = Distributor::new(table)
            .with_suffix_rule(SuffixRule::Last)
            .resolve_weights(&all);
        assert_eq!(last[0].1, 2.0);
    }

    #[test]
    fn test_distribution_is_a_partition_and_conserves_weight() {
        let mut seed: u64 = 7;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            seed >> 33
        };

        for round in 0..20 {
            let n = (next() % 30 + 1) as usize;
            let workers = (next() % 8) as usize;
            let mut table = WeightTable::new();
            let all: Vec<PathBuf> = (0..n)
                .map(|i| {
                    let name = format!("r{}/s{}.feature", round, i);
                    if next() % 3 != 0 {
                        table.insert(name.clone(), WeightEntry::weighted((next() % 50) as f64));
                    }
                    PathBuf::from(name)
                })
                .collect();

            let distributor = Distributor::new(table).with_default_weight(3.0);
            let buckets = distributor.distribute(&all, workers);
            assert_eq!(buckets.len(), workers.clamp(1, n));

            let assigned: Vec<&PathBuf> = buckets.iter().flat_map(|b| b.list.iter()).collect();
            assert_eq!(assigned.len(), n);
            let unique: HashSet<&PathBuf> = assigned.iter().copied().collect();
            assert_eq!(unique.len(), n);

            let resolved = distributor.resolve_weights(&all);
            for bucket in &buckets {
                let sum: f64 = bucket
                    .list
                    .iter()
                    .map(|s| resolved.iter().find(|(p, _)| p == s).map(|(_, w)| *w).unwrap())
                    .sum();
                assert_eq!(sum, bucket.weight);
            }

            assert!(buckets.windows(2).all(|w| w[0].weight >= w[1].weight));
        }
    }
}
