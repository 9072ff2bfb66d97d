use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// On-disk format of the last-checked marker.
pub const MARKER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// PriceSnapshot - Last known cost per SKU
// ---------------------------------------------------------------------------

/// Last known cost for every SKU seen so far, serialized as a flat
/// `{"<sku>": <cost>}` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceSnapshot(BTreeMap<String, f64>);

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sku: &str) -> Option<f64> {
        self.0.get(sku).copied()
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.0.contains_key(sku)
    }

    /// Record `cost` as the latest cost for `sku`, returning the previous one.
    pub fn insert(&mut self, sku: impl Into<String>, cost: f64) -> Option<f64> {
        self.0.insert(sku.into(), cost)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// LastCheckedMarker - Lower bound of the next fetch window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastCheckedMarker {
    #[serde(
        default,
        with = "marker_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_checked: Option<NaiveDateTime>,
}

impl LastCheckedMarker {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            last_checked: Some(time.naive_utc()),
        }
    }

    /// The stored instant, interpreted as UTC.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.last_checked.map(|t| t.and_utc())
    }
}

/// Parse a marker value, accepting either a full timestamp or a bare date.
pub fn parse_marker_time(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, MARKER_FORMAT).or_else(|e| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| d.and_time(NaiveTime::MIN))
            .map_err(|_| e)
    })
}

mod marker_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_str(&t.format(super::MARKER_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|r| super::parse_marker_time(&r).map_err(serde::de::Error::custom))
            .transpose()
    }
}
