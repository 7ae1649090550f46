//! GET handlers documenting the POST body each endpoint expects.

use axum::Json;
use serde_json::{json, Value};

fn example(description: &str, url: &str, extra: Value) -> Json<Value> {
    let mut request_body = json!({
        "mongoURI": "mongodb://your-mongo-uri",
        "dbName": "your-database-name",
        "collectionName": "your-collection-name",
    });
    if let (Some(body), Value::Object(extra)) = (request_body.as_object_mut(), extra) {
        body.extend(extra);
    }

    Json(json!({
        "description": description,
        "method": "POST",
        "url": url,
        "requestBody": request_body,
    }))
}

pub async fn ping() -> Json<Value> {
    example("Example request to check connectivity to MongoDB", "/ping", json!({}))
}

pub async fn find() -> Json<Value> {
    example(
        "Example request to retrieve data from MongoDB",
        "/find",
        json!({
            "query": { "field": "value" },
            "options": {
                "sort": { "field": 1 },
                "projection": { "field": 1 },
                "page": 1,
                "pageSize": 10
            }
        }),
    )
}

pub async fn insert() -> Json<Value> {
    example(
        "Example request to insert data into MongoDB",
        "/insert",
        json!({
            "documents": [
                { "field": "value" },
                { "field": "another value" }
            ],
            "options": { "ordered": true }
        }),
    )
}

pub async fn insert_time_series() -> Json<Value> {
    example(
        "Example request to insert measurements into a MongoDB time-series collection",
        "/insertTimeSeries",
        json!({
            "documents": [
                { "timestamp": "2024-01-01T00:00:00Z", "sensor": "a", "value": 21.5 }
            ],
            "timeField": "timestamp",
            "options": {
                "metaField": "sensor",
                "granularity": "minutes"
            }
        }),
    )
}

pub async fn update() -> Json<Value> {
    example(
        "Example request to update data in MongoDB",
        "/update",
        json!({
            "query": { "field": "value" },
            "update": { "$set": { "fieldToUpdate": "newValue" } },
            "upsert": true,
            "multi": false
        }),
    )
}

pub async fn delete() -> Json<Value> {
    example(
        "Example request to delete data from MongoDB",
        "/delete",
        json!({
            "query": { "field": "value" },
            "multi": false
        }),
    )
}
