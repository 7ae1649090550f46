//! JSON <-> BSON conversion.
//!
//! Request bodies are parsed as MongoDB Extended JSON, so callers can send
//! `{"_id": {"$oid": "..."}}` or `{"at": {"$date": "..."}}`. Replies are
//! rendered as relaxed Extended JSON.

use mongodb::bson::{Bson, DateTime, Document};
use serde_json::Value;

use crate::error::{ProxyError, Result};

pub fn to_document(field: &'static str, value: Value) -> Result<Document> {
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(ProxyError::invalid(field, "must be a JSON object")),
        Err(e) => Err(ProxyError::invalid(field, e.to_string())),
    }
}

/// Accepts a single object or a non-empty array of objects.
pub fn to_documents(field: &'static str, value: Value) -> Result<Vec<Document>> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(ProxyError::invalid(field, "must not be an empty array"));
            }
            items
                .into_iter()
                .map(|item| to_document(field, item))
                .collect()
        }
        Value::Object(_) => Ok(vec![to_document(field, value)?]),
        _ => Err(ProxyError::invalid(
            field,
            "must be a JSON object or an array of objects",
        )),
    }
}

#[derive(Debug)]
pub enum UpdateSpec {
    Operators(Document),
    Pipeline(Vec<Document>),
}

pub fn to_update(field: &'static str, value: Value) -> Result<UpdateSpec> {
    match value {
        Value::Array(stages) => stages
            .into_iter()
            .map(|stage| to_document(field, stage))
            .collect::<Result<Vec<_>>>()
            .map(UpdateSpec::Pipeline),
        other => to_document(field, other).map(UpdateSpec::Operators),
    }
}

pub fn to_json(doc: Document) -> Value {
    Bson::Document(doc).into_relaxed_extjson()
}

pub fn bson_to_json(value: Bson) -> Value {
    value.into_relaxed_extjson()
}

/// Replaces RFC 3339 strings under `time_field` with BSON dates.
pub fn coerce_time_field(docs: &mut [Document], time_field: &str) {
    for doc in docs.iter_mut() {
        let parsed = match doc.get(time_field) {
            Some(Bson::String(text)) => DateTime::parse_rfc3339_str(text).ok(),
            _ => None,
        };
        if let Some(at) = parsed {
            doc.insert(time_field, at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn test_extended_json_object_id() {
        let id = ObjectId::new();
        let filter = to_document("query", json!({ "_id": { "$oid": id.to_hex() } })).unwrap();
        assert_eq!(filter, doc! { "_id": id });
    }

    #[test]
    fn test_non_object_query_rejected() {
        let err = to_document("query", json!([1, 2])).unwrap_err();
        assert!(matches!(err, ProxyError::InvalidField { field: "query", .. }));
    }

    #[test]
    fn test_single_document_is_wrapped() {
        let docs = to_documents("documents", json!({ "name": "a" })).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_empty_documents_rejected() {
        assert!(to_documents("documents", json!([])).is_err());
        assert!(to_documents("documents", json!("text")).is_err());
        assert!(to_documents("documents", json!([{ "a": 1 }, 2])).is_err());
    }

    #[test]
    fn test_pipeline_update() {
        let update = to_update("update", json!([{ "$set": { "a": 1 } }])).unwrap();
        assert!(matches!(update, UpdateSpec::Pipeline(stages) if stages.len() == 1));

        let update = to_update("update", json!({ "$inc": { "n": 1 } })).unwrap();
        assert!(matches!(update, UpdateSpec::Operators(_)));
    }

    #[test]
    fn test_coerce_time_field() {
        let mut docs = vec![
            doc! { "ts": "2024-05-01T12:00:00Z", "v": 1 },
            doc! { "ts": "not a date", "v": 2 },
        ];
        coerce_time_field(&mut docs, "ts");
        assert!(matches!(docs[0].get("ts"), Some(Bson::DateTime(_))));
        assert!(matches!(docs[1].get("ts"), Some(Bson::String(_))));
    }

    #[test]
    fn test_output_is_relaxed_json() {
        let value = to_json(doc! { "n": 5_i32, "name": "x" });
        assert_eq!(value, json!({ "n": 5, "name": "x" }));
    }
}
