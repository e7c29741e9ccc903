//! Schema-flexible documents as stored by the remote document database.
//!
//! System attributes (`$id`, `$collectionId`, `$createdAt`, `$updatedAt`) are
//! lifted into typed fields; everything else stays in a JSON map and is
//! decoded into domain models by [`crate::models`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::ATTR_ID;
use crate::error::ModelError;
use crate::types::{DocumentId, Revision};

/// Free-form attribute map of a document.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: DocumentId,
    #[serde(rename = "$collectionId", default)]
    pub collection: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Fields,
}

/// A page of documents as returned by list and search calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Document>,
}

impl Document {
    /// Version token for conditional updates. Changes on every write.
    pub fn revision(&self) -> Revision {
        Revision(
            self.updated_at
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        )
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.data.get(attribute)
    }

    pub fn str_attr(&self, attribute: &str) -> Result<&str, ModelError> {
        match self.data.get(attribute) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(self.invalid(attribute)),
            None => Err(self.missing(attribute)),
        }
    }

    /// A string attribute that may be absent or `null`.
    pub fn opt_str_attr(&self, attribute: &str) -> Result<Option<&str>, ModelError> {
        match self.data.get(attribute) {
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(self.invalid(attribute)),
        }
    }

    /// A list of plain strings; absent or `null` decodes as empty.
    pub fn str_list(&self, attribute: &str) -> Result<Vec<String>, ModelError> {
        match self.data.get(attribute) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(String::from).ok_or_else(|| self.invalid(attribute)))
                .collect(),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(self.invalid(attribute)),
        }
    }

    /// A single relationship reference. The service returns either the bare
    /// id or the expanded related document.
    pub fn ref_attr<T: From<String>>(&self, attribute: &str) -> Result<T, ModelError> {
        match self.data.get(attribute) {
            Some(value) => reference_id(value)
                .map(T::from)
                .ok_or_else(|| self.invalid(attribute)),
            None => Err(self.missing(attribute)),
        }
    }

    /// A to-many relationship, accepting ids or expanded documents.
    pub fn ref_list<T: From<String>>(&self, attribute: &str) -> Result<Vec<T>, ModelError> {
        match self.data.get(attribute) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| reference_id(v).map(T::from).ok_or_else(|| self.invalid(attribute)))
                .collect(),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(self.invalid(attribute)),
        }
    }

    fn missing(&self, attribute: &str) -> ModelError {
        ModelError::MissingAttribute {
            collection: self.collection.clone(),
            attribute: attribute.to_string(),
        }
    }

    fn invalid(&self, attribute: &str) -> ModelError {
        ModelError::InvalidAttribute {
            collection: self.collection.clone(),
            attribute: attribute.to_string(),
        }
    }
}

fn reference_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(ATTR_ID)?.as_str().map(String::from),
        _ => None,
    }
}
