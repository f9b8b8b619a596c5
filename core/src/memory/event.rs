use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub id: String,
    pub title: String,
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Record fields this version does not know about. Written back
    /// unchanged on every rewrite, never searched.
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

/// On-disk shape of an event. The id is the key of the enclosing object.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredEvent {
    pub title: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemoryEvent {
    pub fn new(title: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            payload,
            created_at: Some(Utc::now()),
            extra: Map::new(),
        }
    }

    pub(crate) fn from_stored(id: String, stored: StoredEvent) -> Self {
        Self {
            id,
            title: stored.title,
            payload: stored.payload,
            created_at: stored.created_at,
            extra: stored.extra,
        }
    }

    pub(crate) fn to_stored(&self) -> StoredEvent {
        StoredEvent {
            title: self.title.clone(),
            payload: self.payload.clone(),
            created_at: self.created_at,
            extra: self.extra.clone(),
        }
    }

    /// Case-insensitive conjunctive substring match over the title and the
    /// serialized payload. `terms` must already be lowercase.
    pub fn matches(&self, terms: &[String]) -> bool {
        let payload = Value::Object(self.payload.clone()).to_string();
        let haystack = format!("{}\n{}", self.title, payload).to_lowercase();
        terms.iter().all(|term| haystack.contains(term.as_str()))
    }
}
