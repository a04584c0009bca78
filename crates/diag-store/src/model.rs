use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One captured diagnostic event. Observability only, never read back for decisions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagEntry {
    pub at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

impl DiagEntry {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarkerKind {
    Init,
    Heartbeat,
}

/// Single-record marker written under a fixed storage key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub at: DateTime<Utc>,
    pub href: String,
    pub version: String,
}
