//! Short-lived MongoDB connections and the single driver call behind each
//! endpoint.
//!
//! Every operation borrows a [`Connection`] opened for one request. Callers
//! must hand it back through [`Connection::close`] whatever the outcome, so
//! cursors are fully drained inside these functions before returning.

use std::time::Duration;

use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::ErrorKind,
    options::{
        ClientOptions, CreateCollectionOptions, FindOptions, InsertManyOptions,
        TimeseriesGranularity, TimeseriesOptions, UpdateOptions,
    },
    results::CollectionType,
    Client, Collection,
};

use crate::config::ConnectSettings;
use crate::convert::{self, UpdateSpec};
use crate::error::{ProxyError, Result};
use crate::request::{
    DeleteParams, FindParams, Granularity, InsertParams, Target, TimeSeriesParams, UpdateParams,
};
use crate::response::{
    DeleteResponse, FindResponse, InsertResponse, PageMeta, PingResponse,
    TimeSeriesInsertResponse, UpdateResponse,
};

const NAMESPACE_EXISTS: i32 = 48;

pub struct Connection {
    client: Client,
    database: String,
    collection: String,
}

impl Connection {
    pub async fn open(target: &Target, settings: &ConnectSettings) -> Result<Self> {
        let mut client_options = ClientOptions::parse(&target.uri).await?;

        if let Some(connect) = settings.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = settings.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if client_options.app_name.is_none() {
            client_options.app_name = settings.app_name.clone();
        }

        let client = Client::with_options(client_options)?;
        tracing::debug!(db = %target.database, collection = %target.collection, "Opened client.");

        Ok(Self {
            client,
            database: target.database.clone(),
            collection: target.collection.clone(),
        })
    }

    pub fn collection(&self) -> Collection<Document> {
        self.client
            .database(&self.database)
            .collection(&self.collection)
    }

    pub async fn close(self) {
        self.client.shutdown().await;
        tracing::debug!(db = %self.database, collection = %self.collection, "Closed client.");
    }
}

pub async fn ping(conn: &Connection) -> Result<PingResponse> {
    let reply = conn
        .client
        .database(&conn.database)
        .run_command(doc! { "ping": 1 })
        .await?;

    Ok(PingResponse {
        acknowledged: true,
        result: convert::to_json(reply),
    })
}

pub async fn find(conn: &Connection, params: FindParams) -> Result<FindResponse> {
    let coll = conn.collection();

    let meta = match &params.paging {
        Some(paging) => {
            let total = coll.count_documents(params.filter.clone()).await?;
            Some(PageMeta::new(total, paging.page, paging.page_size))
        }
        None => None,
    };

    let options = FindOptions::builder()
        .limit(params.limit)
        .skip(params.skip)
        .sort(params.sort)
        .projection(params.projection)
        .build();

    let mut cursor = coll.find(params.filter).with_options(options).await?;
    let mut data = Vec::new();
    while let Some(doc) = cursor.try_next().await? {
        data.push(convert::to_json(doc));
    }

    Ok(FindResponse {
        acknowledged: true,
        count: data.len(),
        data,
        meta,
    })
}

pub async fn insert(conn: &Connection, params: InsertParams) -> Result<InsertResponse> {
    let options = InsertManyOptions::builder()
        .ordered(params.ordered)
        .bypass_document_validation(params.bypass_document_validation)
        .build();

    insert_documents(&conn.collection(), params.documents, options).await
}

async fn insert_documents(
    coll: &Collection<Document>,
    documents: Vec<Document>,
    options: InsertManyOptions,
) -> Result<InsertResponse> {
    let result = coll.insert_many(documents).with_options(options).await?;

    let mut ids: Vec<_> = result.inserted_ids.into_iter().collect();
    ids.sort_by_key(|(index, _)| *index);
    let inserted_ids: Vec<_> = ids
        .into_iter()
        .map(|(_, id)| convert::bson_to_json(id))
        .collect();

    Ok(InsertResponse {
        acknowledged: true,
        inserted_count: inserted_ids.len(),
        message: format!(
            "Insert operation successful, inserted {} record(s)",
            inserted_ids.len()
        ),
        inserted_ids,
    })
}

pub async fn insert_time_series(
    conn: &Connection,
    params: TimeSeriesParams,
) -> Result<TimeSeriesInsertResponse> {
    let collection_created = ensure_time_series_collection(conn, &params).await?;

    let options = InsertManyOptions::builder().ordered(params.ordered).build();
    let insert = insert_documents(&conn.collection(), params.documents, options).await?;

    Ok(TimeSeriesInsertResponse {
        insert,
        time_field: params.time_field,
        collection_created,
    })
}

/// Creates the time-series collection unless it already exists. Returns
/// whether this request created it. An existing collection of another type
/// is rejected rather than written to.
async fn ensure_time_series_collection(
    conn: &Connection,
    params: &TimeSeriesParams,
) -> Result<bool> {
    let db = conn.client.database(&conn.database);

    let mut existing = db
        .list_collections()
        .filter(doc! { "name": conn.collection.as_str() })
        .await?;
    if let Some(spec) = existing.try_next().await? {
        require_time_series(&conn.collection, &spec.collection_type)?;
        return Ok(false);
    }
    drop(existing);

    let timeseries = TimeseriesOptions::builder()
        .time_field(params.time_field.clone())
        .meta_field(params.meta_field.clone())
        .granularity(params.granularity.map(driver_granularity))
        .build();
    let options = CreateCollectionOptions::builder()
        .timeseries(Some(timeseries))
        .expire_after_seconds(params.expire_after_seconds.map(Duration::from_secs))
        .build();

    match db
        .create_collection(&conn.collection)
        .with_options(options)
        .await
    {
        Ok(()) => {
            tracing::info!(
                db = %conn.database,
                collection = %conn.collection,
                time_field = %params.time_field,
                "Created time-series collection."
            );
            Ok(true)
        }
        // Lost a race with another request creating the same collection.
        Err(e) if matches!(*e.kind, ErrorKind::Command(ref cmd) if cmd.code == NAMESPACE_EXISTS) => {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn require_time_series(collection: &str, collection_type: &CollectionType) -> Result<()> {
    match collection_type {
        CollectionType::Timeseries => Ok(()),
        other => Err(ProxyError::invalid(
            "collectionName",
            format!("{collection:?} already exists as a {other:?}, not a time-series collection"),
        )),
    }
}

fn driver_granularity(granularity: Granularity) -> TimeseriesGranularity {
    match granularity {
        Granularity::Seconds => TimeseriesGranularity::Seconds,
        Granularity::Minutes => TimeseriesGranularity::Minutes,
        Granularity::Hours => TimeseriesGranularity::Hours,
    }
}

pub async fn update(conn: &Connection, params: UpdateParams) -> Result<UpdateResponse> {
    let coll = conn.collection();
    let options = UpdateOptions::builder()
        .upsert(Some(params.upsert))
        .array_filters(params.array_filters)
        .bypass_document_validation(params.bypass_document_validation)
        .build();

    let result = match (params.update, params.multi) {
        (UpdateSpec::Operators(update), true) => {
            coll.update_many(params.filter, update).with_options(options).await?
        }
        (UpdateSpec::Operators(update), false) => {
            coll.update_one(params.filter, update).with_options(options).await?
        }
        (UpdateSpec::Pipeline(stages), true) => {
            coll.update_many(params.filter, stages).with_options(options).await?
        }
        (UpdateSpec::Pipeline(stages), false) => {
            coll.update_one(params.filter, stages).with_options(options).await?
        }
    };

    let upserted_count = u64::from(result.upserted_id.is_some());
    Ok(UpdateResponse {
        acknowledged: true,
        matched_count: result.matched_count,
        modified_count: result.modified_count,
        upserted_count,
        upserted_id: result.upserted_id.map(convert::bson_to_json),
        message: "Update operation successful".to_string(),
    })
}

pub async fn delete(conn: &Connection, params: DeleteParams) -> Result<DeleteResponse> {
    let coll = conn.collection();

    let result = if params.multi {
        coll.delete_many(params.filter).await?
    } else {
        coll.delete_one(params.filter).await?
    };

    Ok(DeleteResponse::new(result.deleted_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(uri: &str) -> Target {
        Target {
            uri: uri.to_string(),
            database: "app".to_string(),
            collection: "items".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_rejects_bad_scheme() {
        let result = Connection::open(&target("http://localhost"), &ConnectSettings::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_does_not_contact_server() {
        // Client construction is lazy, so an unroutable host still opens.
        let conn = Connection::open(&target("mongodb://127.0.0.1:1"), &ConnectSettings::default())
            .await
            .unwrap();
        assert_eq!(conn.collection().name(), "items");
        conn.close().await;
    }

    #[test]
    fn test_require_time_series_rejects_regular_collection() {
        assert!(require_time_series("metrics", &CollectionType::Timeseries).is_ok());

        let err = require_time_series("metrics", &CollectionType::Collection).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::InvalidField { field: "collectionName", .. }
        ));
        assert!(require_time_series("metrics", &CollectionType::View).is_err());
    }

    #[test]
    fn test_driver_granularity() {
        assert!(matches!(
            driver_granularity(Granularity::Hours),
            TimeseriesGranularity::Hours
        ));
    }
}
