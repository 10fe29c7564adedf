//! Weighted random task selection over a cumulative-weight table.

use rand::Rng;

/// Picks an index with probability `weight[i] / sum(weights)`.
///
/// Built once per run and shared read-only by every virtual user; each pick
/// draws from the caller's own RNG, so a seeded RNG gives a reproducible sequence.
/// Zero-weight entries are kept in place but can never be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedSelector {
    cumulative: Vec<u64>,
}

impl WeightedSelector {
    /// Returns `None` when there are no weights or they are all zero.
    pub fn new<I>(weights: I) -> Option<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut total = 0u64;
        let cumulative: Vec<u64> = weights
            .into_iter()
            .map(|weight| {
                total += u64::from(weight);
                total
            })
            .collect();

        if total == 0 {
            return None;
        }
        Some(Self { cumulative })
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Expected selection probability of `index`
    pub fn probability(&self, index: usize) -> f64 {
        let upper = self.cumulative[index];
        let lower = if index == 0 { 0 } else { self.cumulative[index - 1] };
        (upper - lower) as f64 / self.total_weight() as f64
    }

    /// O(log n) draw: the first entry whose cumulative weight exceeds the roll.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let roll = rng.gen_range(0..self.total_weight());
        self.cumulative.partition_point(|&bound| bound <= roll)
    }
}
