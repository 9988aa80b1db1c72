use crate::metadata::NftMetadata;

use std::collections::{BTreeMap, HashMap};

/// How many items carry each `(trait_type, value)` pair.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraitCounts {
    counts: HashMap<(String, String), usize>,
}

impl TraitCounts {
    pub fn get(&self, trait_type: &str, value: &str) -> usize {
        self.counts
            .get(&(trait_type.to_string(), value.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &usize)> {
        self.counts.iter()
    }

    /// Counts grouped by trait type, values sorted by descending count then name.
    pub fn by_trait_type(&self) -> BTreeMap<&str, Vec<(&str, usize)>> {
        let mut grouped: BTreeMap<&str, Vec<(&str, usize)>> = BTreeMap::new();
        for ((trait_type, value), &count) in &self.counts {
            grouped
                .entry(trait_type.as_str())
                .or_default()
                .push((value.as_str(), count));
        }
        for values in grouped.values_mut() {
            values.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        }
        grouped
    }
}

/// Tallies every complete attribute across the collection. A pair listed
/// twice on one item counts once for that item.
pub fn aggregate(items: &[NftMetadata]) -> TraitCounts {
    let mut counts = HashMap::new();
    for item in items {
        for key in item.distinct_trait_keys() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    TraitCounts { counts }
}
