use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Separator between the collection label and the token id in `name`.
pub const ID_DELIMITER: char = '#';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub trait_type: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl NftMetadata {
    /// Token id: the second `#`-separated segment of `name`, trimmed.
    pub fn parse_id(&self) -> Option<&str> {
        let mut parts = self.name.split(ID_DELIMITER);
        parts.next();
        parts.next().map(str::trim)
    }

    /// Collection label: everything before the first `#`, trimmed.
    pub fn collection_label(&self) -> &str {
        self.name
            .split(ID_DELIMITER)
            .next()
            .unwrap_or_default()
            .trim()
    }

    /// Attributes that carry both a trait type and a value.
    pub fn trait_keys(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.attributes.iter().filter_map(Attribute::key)
    }

    /// Like [`trait_keys`](Self::trait_keys) but each pair at most once,
    /// in first-seen order.
    pub fn distinct_trait_keys(&self) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        self.trait_keys()
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

impl Attribute {
    /// `(trait_type, value)` when both are present and non-empty.
    ///
    /// Strings are used verbatim; numbers and `true` use their JSON text.
    /// `null`, `""`, `false`, zero and compound values count as missing.
    pub fn key(&self) -> Option<(String, String)> {
        let trait_type = self.trait_type.as_deref().filter(|t| !t.is_empty())?;
        let value = match self.value.as_ref()? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
            Value::Bool(true) => "true".to_string(),
            _ => return None,
        };
        Some((trait_type.to_string(), value))
    }
}
