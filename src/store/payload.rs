//! Payload schema for indexed chunks

use crate::error::{Error, Result};
use qdrant_client::qdrant::{value::Kind, PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// A point ready to be upserted to the index
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

impl ChunkPoint {
    /// Convert to qdrant-client PointStruct
    pub fn to_point_struct(self) -> PointStruct {
        let payload_map = self.payload.to_qdrant_payload();
        PointStruct::new(self.id.to_string(), self.vector, payload_map)
    }
}

/// Payload stored with each chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Owning document (UUID string)
    pub document_id: String,

    /// Name of the uploaded file
    pub filename: String,

    /// Upload time (RFC 3339, session offset)
    pub upload_timestamp: String,

    /// Chunk index within the document
    pub chunk_index: usize,

    /// Text of this chunk
    pub chunk_text: String,

    /// Blake3 digest of the full text (first chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,

    /// Full document text (first chunk only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_text: Option<String>,
}

impl ChunkPayload {
    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("document_id".to_string(), string_to_qdrant(self.document_id));
        map.insert("filename".to_string(), string_to_qdrant(self.filename));
        map.insert(
            "upload_timestamp".to_string(),
            string_to_qdrant(self.upload_timestamp),
        );
        map.insert(
            "chunk_index".to_string(),
            int_to_qdrant(self.chunk_index as i64),
        );
        map.insert("chunk_text".to_string(), string_to_qdrant(self.chunk_text));

        if let Some(hash) = self.content_hash {
            map.insert("content_hash".to_string(), string_to_qdrant(hash));
        }

        if let Some(text) = self.document_text {
            map.insert("document_text".to_string(), string_to_qdrant(text));
        }

        map
    }

    /// Rebuild from a Qdrant payload
    pub fn from_qdrant_payload(payload: HashMap<String, QdrantValue>) -> Result<Self> {
        let map: Map<String, Value> = payload
            .into_iter()
            .map(|(k, v)| (k, json_from_qdrant_value(v)))
            .collect();
        Self::try_from(map)
    }
}

impl TryFrom<Map<String, Value>> for ChunkPayload {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Qdrant(format!("Malformed chunk payload: {}", e)))
    }
}

fn string_to_qdrant(s: String) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::StringValue(s)),
    }
}

fn int_to_qdrant(i: i64) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::IntegerValue(i)),
    }
}

/// Convert Qdrant value to serde_json Value
pub(crate) fn json_from_qdrant_value(v: QdrantValue) -> Value {
    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}
