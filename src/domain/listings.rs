//! Job listing records and the raw record-store rows they are built from.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A normalized job posting as served to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub position: String,
    pub company: String,
    pub summary: String,
    pub url: String,
}

/// One row returned by the record store, keyed by property name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExternalRow {
    #[serde(default)]
    pub properties: HashMap<String, Cell>,
}

impl ExternalRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, name: impl Into<String>, cell: Cell) -> Self {
        self.properties.insert(name.into(), cell);
        self
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.properties.get(name)
    }
}

/// A single typed property value within a row.
///
/// Decoding never fails: unknown kinds and unreadable shapes become
/// [`Cell::Unsupported`] so that one odd cell cannot reject a whole page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    RichText(Vec<RichTextFragment>),
    Url(Option<String>),
    Unsupported,
}

impl Cell {
    pub fn rich_text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::RichText(
            fragments
                .into_iter()
                .map(|text| RichTextFragment {
                    plain_text: text.into(),
                })
                .collect(),
        )
    }

    pub fn url(value: impl Into<String>) -> Self {
        Self::Url(Some(value.into()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RichTextFragment {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedCell {
    RichText {
        #[serde(default)]
        rich_text: Option<Vec<RichTextFragment>>,
    },
    Url {
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let cell = match serde_json::from_value::<TaggedCell>(value) {
            Ok(TaggedCell::RichText { rich_text }) => Cell::RichText(rich_text.unwrap_or_default()),
            Ok(TaggedCell::Url { url }) => Cell::Url(url),
            Ok(TaggedCell::Other) | Err(_) => Cell::Unsupported,
        };
        Ok(cell)
    }
}
