use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One result row: binding name -> node attributes (`None` for an optional
/// binding that did not match)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Option<Value>>);

impl Row {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<Value>)>,
        S: Into<String>,
    {
        Row(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Whether `name` is present as a key, matched or not
    pub fn has_binding(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&Value> {
        self.0.get(name).and_then(Option::as_ref)
    }

    pub fn id(&self, name: &str) -> Option<&str> {
        self.attr_str(name, "id")
    }

    pub fn attr_str(&self, name: &str, attr: &str) -> Option<&str> {
        self.node(name)?.get(attr)?.as_str()
    }

    /// Deserialize the node bound to `name` into a typed record
    pub fn decode<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.node(name)?;
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!(binding = name, "Could not decode query node: {}", e);
                None
            }
        }
    }

    /// Insert `None` for every expected binding the engine left out
    pub(crate) fn fill_missing(&mut self, names: &[String]) {
        for name in names {
            self.0.entry(name.clone()).or_insert(None);
        }
    }
}

/// How to pick a single row when a query can legitimately return several.
///
/// The query engine does not promise a row order, so `First` is only a
/// stable choice when the caller does not care which match it gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    #[default]
    First,
    /// Refuse to choose when more than one row matched
    Unique,
}

impl TieBreak {
    pub fn select<'a>(&self, rows: &'a [Row]) -> Option<&'a Row> {
        match self {
            TieBreak::First => rows.first(),
            TieBreak::Unique if rows.len() == 1 => rows.first(),
            TieBreak::Unique => {
                if rows.len() > 1 {
                    tracing::warn!(rows = rows.len(), "Ambiguous query result, refusing to pick one");
                }
                None
            }
        }
    }
}
