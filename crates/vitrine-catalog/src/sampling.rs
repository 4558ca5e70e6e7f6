//! Store-diversified random sampling for the landing view.
//!
//! Items are bucketed by key, each bucket keeps a bounded reservoir, and the
//! result is drawn round-robin across buckets in random bucket order before a
//! final shuffle. Small keys therefore get a slot in every round instead of
//! being drowned out by large ones.

use std::collections::HashMap;
use std::hash::Hash;

use rand::seq::SliceRandom;
use rand::Rng;
use vitrine_core::CatalogTuning;

/// Reservoir bounds for [`diversified_sample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    /// Maximum candidates retained per key.
    pub per_key: usize,
    /// Chance that an item arriving at a full reservoir replaces a random slot.
    pub replace_probability: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::from(&CatalogTuning::default())
    }
}

impl From<&CatalogTuning> for SamplingConfig {
    fn from(tuning: &CatalogTuning) -> Self {
        Self {
            per_key: tuning.sample_per_store,
            replace_probability: tuning.sample_replace_probability,
        }
    }
}

/// Draws up to `limit` items, balanced across the groups produced by `key_fn`.
///
/// Memory stays bounded by `groups * config.per_key` regardless of input
/// length. Every item, including ones late in the input, can reach a
/// reservoir. The output order carries no grouping.
pub fn diversified_sample<'a, T, K, F, R>(
    items: impl IntoIterator<Item = &'a T>,
    mut key_fn: F,
    limit: usize,
    config: &SamplingConfig,
    rng: &mut R,
) -> Vec<&'a T>
where
    T: 'a,
    K: Eq + Hash,
    F: FnMut(&'a T) -> K,
    R: Rng + ?Sized,
{
    if limit == 0 || config.per_key == 0 {
        return Vec::new();
    }
    let replace_probability = config.replace_probability.clamp(0.0, 1.0);

    let mut slot_of: HashMap<K, usize> = HashMap::new();
    let mut buckets: Vec<Vec<&'a T>> = Vec::new();

    for item in items {
        let slot = *slot_of.entry(key_fn(item)).or_insert_with(|| {
            buckets.push(Vec::with_capacity(config.per_key));
            buckets.len() - 1
        });
        let bucket = &mut buckets[slot];
        if bucket.len() < config.per_key {
            bucket.push(item);
        } else if rng.random_bool(replace_probability) {
            let victim = rng.random_range(0..config.per_key);
            bucket[victim] = item;
        }
    }

    for bucket in &mut buckets {
        bucket.shuffle(rng);
    }
    buckets.shuffle(rng);

    let mut picked = Vec::with_capacity(limit.min(buckets.len() * config.per_key));
    'rounds: loop {
        let mut progressed = false;
        for bucket in &mut buckets {
            if picked.len() >= limit {
                break 'rounds;
            }
            if let Some(item) = bucket.pop() {
                picked.push(item);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    picked.shuffle(rng);
    picked
}
