use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub acknowledged: bool,
    pub result: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_records: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(total_records: u64, current_page: u64, page_size: u64) -> Self {
        Self {
            total_records,
            current_page,
            page_size,
            total_pages: total_records.div_ceil(page_size),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FindResponse {
    pub acknowledged: bool,
    pub count: usize,
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResponse {
    pub acknowledged: bool,
    pub inserted_count: usize,
    pub inserted_ids: Vec<Value>,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesInsertResponse {
    #[serde(flatten)]
    pub insert: InsertResponse,
    pub time_field: String,
    pub collection_created: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Value>,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub acknowledged: bool,
    pub deleted_count: u64,
    pub message: String,
}

impl DeleteResponse {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
            message: format!("Delete operation successful, deleted {deleted_count} record(s)"),
        }
    }
}
