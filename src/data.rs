// Canonical record model shared by the normalizer, the store and the query path

use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};

/// One normalized country's year → population mapping.
///
/// Values are either finite numbers or `None`; the constructor and
/// [`CanonicalRecord::set`] turn non-finite inputs into `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    country: String,
    values: BTreeMap<i32, Option<f64>>,
}

impl CanonicalRecord {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_values<I>(country: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (i32, Option<f64>)>,
    {
        let mut record = Self::new(country);
        for (year, value) in values {
            record.set(year, value);
        }
        record
    }

    pub fn set(&mut self, year: i32, value: Option<f64>) {
        self.values.insert(year, value.filter(|v| v.is_finite()));
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// `None` when the year is absent; `Some(None)` when present but null.
    pub fn value(&self, year: i32) -> Option<Option<f64>> {
        self.values.get(&year).copied()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.values.keys().copied()
    }

    fn from_json_object(obj: &Map<String, Value>) -> Result<Self, String> {
        let country = match obj.get("country") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => return Err(format!("'country' must be a string, got {}", other)),
            None => return Err("record is missing the 'country' field".to_string()),
        };

        let mut record = Self::new(country);
        for (key, value) in obj {
            if key == "country" {
                continue;
            }
            let year = parse_year_label(key)
                .ok_or_else(|| format!("unexpected field '{}' in record", key))?;
            let value = match value {
                Value::Null => None,
                Value::Number(n) => n.as_f64(),
                other => return Err(format!("year {} holds a non-numeric value {}", year, other)),
            };
            record.set(year, value);
        }
        Ok(record)
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("country", &self.country)?;
        for (year, value) in &self.values {
            map.serialize_entry(&year.to_string(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CanonicalRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let obj = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_json_object(&obj).map_err(D::Error::custom)
    }
}

/// Parse a column label made entirely of ASCII digits into a year.
pub fn parse_year_label(label: &str) -> Option<i32> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    label.parse().ok()
}

/// A complete, immutable store snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub records: Vec<CanonicalRecord>,
    /// SHA-256 of the raw content that produced this snapshot, if known.
    pub fingerprint: Option<String>,
}

impl Snapshot {
    pub fn new(records: Vec<CanonicalRecord>, fingerprint: Option<String>) -> Self {
        Self { records, fingerprint }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every year present in at least one record, ascending.
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.records.iter().flat_map(|r| r.years()).collect();
        years.into_iter().collect()
    }
}

pub fn fingerprint(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}
