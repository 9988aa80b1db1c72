use crate::metadata::NftMetadata;
use crate::rarity::{RarityRecord, TraitRarities};

use anyhow::{Context, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Collection name used when no metadata was obtained at all.
pub const UNKNOWN_COLLECTION: &str = "Unknown";

const REPORT_SUFFIX: &str = "_rarity_rankings.json";

/// Sorts by descending score. Ties keep their incoming order.
pub fn rank(mut records: Vec<RarityRecord>) -> Vec<RarityRecord> {
    records.sort_by(|a, b| b.total_rarity_score.total_cmp(&a.total_rarity_score));
    records
}

/// Label of the first item, or [`UNKNOWN_COLLECTION`] for an empty collection.
pub fn collection_name(items: &[NftMetadata]) -> String {
    items
        .first()
        .map(|m| m.collection_label().to_string())
        .unwrap_or_else(|| UNKNOWN_COLLECTION.to_string())
}

pub fn report_file_name(collection_name: &str) -> String {
    format!("{collection_name}{REPORT_SUFFIX}").replace(' ', "_")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub rank: usize,
    pub total_rarity_score: f64,
    pub trait_rarities: TraitRarities,
}

/// `"<collection> #<id>"` -> entry, in rank order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedReport {
    pub collection_name: String,
    entries: Vec<(String, ReportEntry)>,
}

impl RankedReport {
    /// Keys are unique. When two records map to the same key, the later one
    /// replaces the earlier entry's values in place.
    pub fn build(ranked: Vec<RarityRecord>, collection_name: &str) -> Self {
        let mut entries: Vec<(String, ReportEntry)> = Vec::with_capacity(ranked.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(ranked.len());

        for (i, record) in ranked.into_iter().enumerate() {
            let key = format!("{collection_name} #{}", record.id);
            let entry = ReportEntry {
                rank: i + 1,
                total_rarity_score: record.total_rarity_score,
                trait_rarities: record.trait_rarities,
            };

            match positions.get(&key) {
                Some(&pos) => {
                    log::warn!("duplicate report key {key:?}, keeping the entry ranked {}", entry.rank);
                    entries[pos].1 = entry;
                }
                None => {
                    positions.insert(key.clone(), entries.len());
                    entries.push((key, entry));
                }
            }
        }

        Self {
            collection_name: collection_name.to_string(),
            entries,
        }
    }

    pub fn entries(&self) -> &[(String, ReportEntry)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .context("failed to serialize rarity report")?;
        String::from_utf8(buf).context("rarity report is not valid UTF-8")
    }

    /// Writes `<collection>_rarity_rankings.json` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(report_file_name(&self.collection_name));
        let json = self.to_json_pretty()?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write rarity report: {}", path.display()))?;
        Ok(path)
    }
}

impl Serialize for RankedReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}
