use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::db::{self, Connection};
use crate::error::Result;
use crate::request::{
    DeleteRequest, FindRequest, InsertRequest, PingRequest, Target, TimeSeriesRequest,
    UpdateRequest,
};
use crate::response::{
    DeleteResponse, FindResponse, InsertResponse, PingResponse, TimeSeriesInsertResponse,
    UpdateResponse,
};
use crate::AppState;

pub async fn ping(
    State(state): State<AppState>,
    body: std::result::Result<Json<PingRequest>, JsonRejection>,
) -> Result<Json<PingResponse>> {
    let Json(body) = body?;
    let target = body.validate()?;

    let conn = Connection::open(&target, &state.connect).await?;
    let outcome = db::ping(&conn).await;
    conn.close().await;
    let reply = outcome?;
    tracing::debug!(db = %target.database, "Ping succeeded.");
    Ok(Json(reply))
}

pub async fn find(
    State(state): State<AppState>,
    body: std::result::Result<Json<FindRequest>, JsonRejection>,
) -> Result<Json<FindResponse>> {
    let Json(body) = body?;
    let params = body.validate()?;
    let target = params.target.clone();

    let conn = Connection::open(&target, &state.connect).await?;
    let outcome = db::find(&conn, params).await;
    conn.close().await;
    let found = outcome?;
    log_done("find", &target, found.count as u64);
    Ok(Json(found))
}

pub async fn insert(
    State(state): State<AppState>,
    body: std::result::Result<Json<InsertRequest>, JsonRejection>,
) -> Result<Json<InsertResponse>> {
    let Json(body) = body?;
    let params = body.validate()?;
    let target = params.target.clone();

    let conn = Connection::open(&target, &state.connect).await?;
    let outcome = db::insert(&conn, params).await;
    conn.close().await;
    let inserted = outcome?;
    log_done("insert", &target, inserted.inserted_count as u64);
    Ok(Json(inserted))
}

pub async fn insert_time_series(
    State(state): State<AppState>,
    body: std::result::Result<Json<TimeSeriesRequest>, JsonRejection>,
) -> Result<Json<TimeSeriesInsertResponse>> {
    let Json(body) = body?;
    let params = body.validate()?;
    let target = params.target.clone();

    let conn = Connection::open(&target, &state.connect).await?;
    let outcome = db::insert_time_series(&conn, params).await;
    conn.close().await;
    let inserted = outcome?;
    log_done("insertTimeSeries", &target, inserted.insert.inserted_count as u64);
    Ok(Json(inserted))
}

pub async fn update(
    State(state): State<AppState>,
    body: std::result::Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>> {
    let Json(body) = body?;
    let params = body.validate()?;
    let target = params.target.clone();

    let conn = Connection::open(&target, &state.connect).await?;
    let outcome = db::update(&conn, params).await;
    conn.close().await;
    let updated = outcome?;
    log_done("update", &target, updated.modified_count);
    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    body: std::result::Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse>> {
    let Json(body) = body?;
    let params = body.validate()?;
    let target = params.target.clone();

    let conn = Connection::open(&target, &state.connect).await?;
    let outcome = db::delete(&conn, params).await;
    conn.close().await;
    let deleted = outcome?;
    log_done("delete", &target, deleted.deleted_count);
    Ok(Json(deleted))
}

fn log_done(operation: &str, target: &Target, affected: u64) {
    tracing::info!(
        operation,
        db = %target.database,
        collection = %target.collection,
        affected,
        "Operation completed."
    );
}
