use crate::metadata::NftMetadata;
use crate::traits::TraitCounts;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Per-value scores of one item, kept in attribute order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraitRarities(Vec<(String, f64)>);

impl TraitRarities {
    /// Adds a score. A value already present (from another trait type)
    /// accumulates instead of being replaced.
    pub fn add(&mut self, value: String, score: f64) {
        match self.0.iter_mut().find(|(v, _)| *v == value) {
            Some((_, existing)) => *existing += score,
            None => self.0.push((value, score)),
        }
    }

    pub fn get(&self, value: &str) -> Option<f64> {
        self.0.iter().find(|(v, _)| v == value).map(|(_, s)| *s)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().map(|(_, s)| s).sum()
    }
}

impl Serialize for TraitRarities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (value, score) in &self.0 {
            map.serialize_entry(value, score)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RarityRecord {
    pub id: String,
    pub total_rarity_score: f64,
    pub trait_rarities: TraitRarities,
}

/// Scores every item whose name carries an id. Each complete trait adds
/// `total_count / count(trait_type, value)`.
pub fn score(items: &[NftMetadata], counts: &TraitCounts, total_count: u64) -> Vec<RarityRecord> {
    let total = total_count as f64;
    let mut records = Vec::with_capacity(items.len());

    for item in items {
        let Some(id) = item.parse_id() else {
            log::warn!("no id found in metadata item name {:?}, skipping", item.name);
            continue;
        };

        let mut trait_rarities = TraitRarities::default();
        let mut total_rarity_score = 0.0;
        for (trait_type, value) in item.distinct_trait_keys() {
            let frequency = counts.get(&trait_type, &value);
            if frequency == 0 {
                continue;
            }
            let trait_score = total / frequency as f64;
            trait_rarities.add(value, trait_score);
            total_rarity_score += trait_score;
        }

        records.push(RarityRecord {
            id: id.to_string(),
            total_rarity_score,
            trait_rarities,
        });
    }

    records
}
