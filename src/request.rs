//! Request bodies and their presence validation.
//!
//! Every body is deserialized with all fields optional, then checked in one
//! pass so a 400 lists every missing field. Nothing here touches the network.

use mongodb::bson::Document;
use serde::Deserialize;
use serde_json::Value;

use crate::convert::{self, UpdateSpec};
use crate::error::{ProxyError, Result};

const PING_FIELDS: &[&str] = &["mongoURI", "dbName", "collectionName"];
const FIND_FIELDS: &[&str] = &["mongoURI", "dbName", "collectionName"];
const INSERT_FIELDS: &[&str] = &["mongoURI", "dbName", "collectionName", "documents"];
const UPDATE_FIELDS: &[&str] = &["mongoURI", "dbName", "collectionName", "query", "update"];
const DELETE_FIELDS: &[&str] = &["mongoURI", "dbName", "collectionName", "query"];

pub const DEFAULT_TIME_FIELD: &str = "timestamp";
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Where a request goes: connection string, database and collection.
#[derive(Debug, Clone)]
pub struct Target {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetBody {
    #[serde(rename = "mongoURI")]
    pub mongo_uri: Option<String>,
    #[serde(rename = "dbName")]
    pub db_name: Option<String>,
    #[serde(rename = "collectionName")]
    pub collection_name: Option<String>,
}

/// Collects missing field names while pulling values out of a body.
struct Presence {
    required: &'static [&'static str],
    missing: Vec<&'static str>,
}

impl Presence {
    fn new(required: &'static [&'static str]) -> Self {
        Self {
            required,
            missing: Vec::new(),
        }
    }

    fn text(&mut self, name: &'static str, value: Option<String>) -> String {
        match value {
            Some(text) if !text.is_empty() => text,
            _ => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    fn json(&mut self, name: &'static str, value: Option<Value>) -> Value {
        match value {
            Some(Value::Null) | None => {
                self.missing.push(name);
                Value::Null
            }
            Some(value) => value,
        }
    }

    fn target(&mut self, body: TargetBody) -> Target {
        Target {
            uri: self.text("mongoURI", body.mongo_uri),
            database: self.text("dbName", body.db_name),
            collection: self.text("collectionName", body.collection_name),
        }
    }

    fn finish(self) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ProxyError::MissingFields {
                required: self.required,
                missing: self.missing,
            })
        }
    }
}

// ==================
// ping
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct PingRequest {
    #[serde(flatten)]
    pub target: TargetBody,
}

impl PingRequest {
    pub fn validate(self) -> Result<Target> {
        let mut presence = Presence::new(PING_FIELDS);
        let target = presence.target(self.target);
        presence.finish()?;
        Ok(target)
    }
}

// ==================
// find
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct FindRequest {
    #[serde(flatten)]
    pub target: TargetBody,
    pub query: Option<Value>,
    pub options: Option<FindOptionsBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptionsBody {
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub sort: Option<Value>,
    pub projection: Option<Value>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug)]
pub struct Paging {
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug)]
pub struct FindParams {
    pub target: Target,
    pub filter: Document,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub paging: Option<Paging>,
}

impl FindRequest {
    pub fn validate(self) -> Result<FindParams> {
        let mut presence = Presence::new(FIND_FIELDS);
        let target = presence.target(self.target);
        presence.finish()?;

        let filter = match self.query {
            Some(Value::Null) | None => Document::new(),
            Some(query) => convert::to_document("query", query)?,
        };
        let options = self.options.unwrap_or_default();
        let sort = options
            .sort
            .map(|sort| convert::to_document("options.sort", sort))
            .transpose()?;
        let projection = options
            .projection
            .map(|projection| convert::to_document("options.projection", projection))
            .transpose()?;

        let paging = match (options.page, options.page_size) {
            (None, None) => None,
            (page, page_size) => {
                let page = page.unwrap_or(1);
                let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
                if page == 0 {
                    return Err(ProxyError::invalid("options.page", "must be at least 1"));
                }
                if page_size == 0 {
                    return Err(ProxyError::invalid("options.pageSize", "must be at least 1"));
                }
                Some(Paging { page, page_size })
            }
        };

        // Paging wins over explicit skip/limit.
        let (skip, limit) = match &paging {
            Some(paging) => {
                let limit = i64::try_from(paging.page_size).map_err(|_| {
                    ProxyError::invalid(
                        "options.pageSize",
                        format!("must not exceed {}", i64::MAX),
                    )
                })?;
                let skip = (paging.page - 1)
                    .checked_mul(paging.page_size)
                    .ok_or_else(|| {
                        ProxyError::invalid("options.page", "page * pageSize is out of range")
                    })?;
                (Some(skip), Some(limit))
            }
            None => (options.skip, options.limit),
        };

        Ok(FindParams {
            target,
            filter,
            limit,
            skip,
            sort,
            projection,
            paging,
        })
    }
}

// ==================
// insert / insertTimeSeries
// ==================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOptionsBody {
    pub ordered: Option<bool>,
    pub bypass_document_validation: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InsertRequest {
    #[serde(flatten)]
    pub target: TargetBody,
    pub documents: Option<Value>,
    pub options: Option<InsertOptionsBody>,
}

#[derive(Debug)]
pub struct InsertParams {
    pub target: Target,
    pub documents: Vec<Document>,
    pub ordered: Option<bool>,
    pub bypass_document_validation: Option<bool>,
}

impl InsertRequest {
    pub fn validate(self) -> Result<InsertParams> {
        let mut presence = Presence::new(INSERT_FIELDS);
        let target = presence.target(self.target);
        let documents = presence.json("documents", self.documents);
        presence.finish()?;

        let options = self.options.unwrap_or_default();
        Ok(InsertParams {
            target,
            documents: convert::to_documents("documents", documents)?,
            ordered: options.ordered,
            bypass_document_validation: options.bypass_document_validation,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Seconds,
    Minutes,
    Hours,
}

impl std::str::FromStr for Granularity {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "seconds" => Ok(Granularity::Seconds),
            "minutes" => Ok(Granularity::Minutes),
            "hours" => Ok(Granularity::Hours),
            other => Err(ProxyError::invalid(
                "options.granularity",
                format!("expected seconds, minutes or hours, got {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesOptionsBody {
    pub meta_field: Option<String>,
    pub granularity: Option<String>,
    pub expire_after_seconds: Option<u64>,
    pub ordered: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesRequest {
    #[serde(flatten)]
    pub target: TargetBody,
    pub documents: Option<Value>,
    pub time_field: Option<String>,
    pub options: Option<TimeSeriesOptionsBody>,
}

#[derive(Debug)]
pub struct TimeSeriesParams {
    pub target: Target,
    pub documents: Vec<Document>,
    pub time_field: String,
    pub meta_field: Option<String>,
    pub granularity: Option<Granularity>,
    pub expire_after_seconds: Option<u64>,
    pub ordered: Option<bool>,
}

impl TimeSeriesRequest {
    pub fn validate(self) -> Result<TimeSeriesParams> {
        let mut presence = Presence::new(INSERT_FIELDS);
        let target = presence.target(self.target);
        let documents = presence.json("documents", self.documents);
        presence.finish()?;

        let time_field = self
            .time_field
            .filter(|field| !field.is_empty())
            .unwrap_or_else(|| DEFAULT_TIME_FIELD.to_string());
        let options = self.options.unwrap_or_default();
        let granularity = options
            .granularity
            .as_deref()
            .map(str::parse::<Granularity>)
            .transpose()?;

        let mut documents = convert::to_documents("documents", documents)?;
        convert::coerce_time_field(&mut documents, &time_field);

        Ok(TimeSeriesParams {
            target,
            documents,
            time_field,
            meta_field: options.meta_field,
            granularity,
            expire_after_seconds: options.expire_after_seconds,
            ordered: options.ordered,
        })
    }
}

// ==================
// update
// ==================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptionsBody {
    pub array_filters: Option<Vec<Value>>,
    pub bypass_document_validation: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub target: TargetBody,
    pub query: Option<Value>,
    pub update: Option<Value>,
    pub upsert: Option<bool>,
    pub multi: Option<bool>,
    pub options: Option<UpdateOptionsBody>,
}

#[derive(Debug)]
pub struct UpdateParams {
    pub target: Target,
    pub filter: Document,
    pub update: UpdateSpec,
    pub upsert: bool,
    pub multi: bool,
    pub array_filters: Option<Vec<Document>>,
    pub bypass_document_validation: Option<bool>,
}

impl UpdateRequest {
    pub fn validate(self) -> Result<UpdateParams> {
        let mut presence = Presence::new(UPDATE_FIELDS);
        let target = presence.target(self.target);
        let query = presence.json("query", self.query);
        let update = presence.json("update", self.update);
        presence.finish()?;

        let options = self.options.unwrap_or_default();
        let array_filters = options
            .array_filters
            .map(|filters| {
                filters
                    .into_iter()
                    .map(|filter| convert::to_document("options.arrayFilters", filter))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        Ok(UpdateParams {
            target,
            filter: convert::to_document("query", query)?,
            update: convert::to_update("update", update)?,
            upsert: self.upsert.unwrap_or(false),
            multi: self.multi.unwrap_or(false),
            array_filters,
            bypass_document_validation: options.bypass_document_validation,
        })
    }
}

// ==================
// delete
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    #[serde(flatten)]
    pub target: TargetBody,
    pub query: Option<Value>,
    pub multi: Option<bool>,
}

#[derive(Debug)]
pub struct DeleteParams {
    pub target: Target,
    pub filter: Document,
    pub multi: bool,
}

impl DeleteRequest {
    pub fn validate(self) -> Result<DeleteParams> {
        let mut presence = Presence::new(DELETE_FIELDS);
        let target = presence.target(self.target);
        let query = presence.json("query", self.query);
        presence.finish()?;

        Ok(DeleteParams {
            target,
            filter: convert::to_document("query", query)?,
            multi: self.multi.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target_json() -> Value {
        json!({
            "mongoURI": "mongodb://localhost:27017",
            "dbName": "app",
            "collectionName": "items",
        })
    }

    fn with(extra: Value) -> Value {
        let mut body = target_json();
        for (key, value) in extra.as_object().unwrap() {
            body[key] = value.clone();
        }
        body
    }

    fn missing(err: ProxyError) -> Vec<&'static str> {
        match err {
            ProxyError::MissingFields { missing, .. } => missing,
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn test_ping_lists_all_missing_fields() {
        let req: PingRequest = serde_json::from_value(json!({ "dbName": "" })).unwrap();
        assert_eq!(
            missing(req.validate().unwrap_err()),
            vec!["mongoURI", "dbName", "collectionName"]
        );
    }

    #[test]
    fn test_find_defaults_to_empty_filter() {
        let req: FindRequest = serde_json::from_value(target_json()).unwrap();
        let params = req.validate().unwrap();
        assert!(params.filter.is_empty());
        assert!(params.paging.is_none());
        assert_eq!(params.target.collection, "items");
    }

    #[test]
    fn test_find_paging_derives_skip_and_limit() {
        let req: FindRequest =
            serde_json::from_value(with(json!({ "options": { "page": 3, "pageSize": 20 } })))
                .unwrap();
        let params = req.validate().unwrap();
        assert_eq!(params.skip, Some(40));
        assert_eq!(params.limit, Some(20));

        let req: FindRequest =
            serde_json::from_value(with(json!({ "options": { "page": 2 } }))).unwrap();
        let params = req.validate().unwrap();
        assert_eq!(params.skip, Some(DEFAULT_PAGE_SIZE));
        assert_eq!(params.limit, Some(DEFAULT_PAGE_SIZE as i64));
    }

    #[test]
    fn test_find_rejects_page_zero() {
        let req: FindRequest =
            serde_json::from_value(with(json!({ "options": { "page": 0 } }))).unwrap();
        assert!(matches!(
            req.validate(),
            Err(ProxyError::InvalidField { field: "options.page", .. })
        ));
    }

    #[test]
    fn test_find_rejects_page_overflowing_skip() {
        let req: FindRequest = serde_json::from_value(with(
            json!({ "options": { "page": u64::MAX, "pageSize": 2 } }),
        ))
        .unwrap();
        assert!(matches!(
            req.validate(),
            Err(ProxyError::InvalidField { field: "options.page", .. })
        ));
    }

    #[test]
    fn test_find_rejects_page_size_beyond_i64() {
        let req: FindRequest = serde_json::from_value(with(
            json!({ "options": { "page": 1, "pageSize": u64::MAX } }),
        ))
        .unwrap();
        assert!(matches!(
            req.validate(),
            Err(ProxyError::InvalidField { field: "options.pageSize", .. })
        ));
    }

    #[test]
    fn test_find_accepts_largest_page_size() {
        let req: FindRequest = serde_json::from_value(with(
            json!({ "options": { "page": 1, "pageSize": i64::MAX as u64 } }),
        ))
        .unwrap();
        let params = req.validate().unwrap();
        assert_eq!(params.skip, Some(0));
        assert_eq!(params.limit, Some(i64::MAX));
    }

    #[test]
    fn test_insert_requires_documents() {
        let req: InsertRequest =
            serde_json::from_value(with(json!({ "documents": null }))).unwrap();
        assert_eq!(missing(req.validate().unwrap_err()), vec!["documents"]);
    }

    #[test]
    fn test_time_series_defaults() {
        let req: TimeSeriesRequest = serde_json::from_value(with(json!({
            "documents": [{ "timestamp": "2024-01-01T00:00:00Z", "value": 1 }],
            "options": { "granularity": "minutes" },
        })))
        .unwrap();
        let params = req.validate().unwrap();
        assert_eq!(params.time_field, DEFAULT_TIME_FIELD);
        assert_eq!(params.granularity, Some(Granularity::Minutes));
        assert!(params.documents[0].get_datetime("timestamp").is_ok());
    }

    #[test]
    fn test_time_series_rejects_unknown_granularity() {
        let req: TimeSeriesRequest = serde_json::from_value(with(json!({
            "documents": [{ "timestamp": "2024-01-01T00:00:00Z" }],
            "options": { "granularity": "days" },
        })))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_requires_query_and_update() {
        let req: UpdateRequest = serde_json::from_value(target_json()).unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please provide mongoURI, dbName, collectionName, query, and update."
        );
        assert_eq!(missing(err), vec!["query", "update"]);
    }

    #[test]
    fn test_update_flags_default_to_false() {
        let req: UpdateRequest = serde_json::from_value(with(json!({
            "query": { "a": 1 },
            "update": { "$set": { "b": 2 } },
        })))
        .unwrap();
        let params = req.validate().unwrap();
        assert!(!params.multi);
        assert!(!params.upsert);
    }

    #[test]
    fn test_delete_accepts_empty_query() {
        let req: DeleteRequest =
            serde_json::from_value(with(json!({ "query": {}, "multi": true }))).unwrap();
        let params = req.validate().unwrap();
        assert!(params.filter.is_empty());
        assert!(params.multi);
    }
}
