use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Please provide {}.", join_fields(.required))]
    MissingFields {
        required: &'static [&'static str],
        missing: Vec<&'static str>,
    },

    #[error("Invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("{0}")]
    Database(#[from] mongodb::error::Error),
}

impl ProxyError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ProxyError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::MissingFields { .. }
            | ProxyError::InvalidField { .. }
            | ProxyError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ProxyError {
    fn from(rejection: JsonRejection) -> Self {
        ProxyError::MalformedBody(rejection.body_text())
    }
}

/// "a, b, and c" the way the validation messages spell field lists.
fn join_fields(fields: &[&str]) -> String {
    match fields {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

/// Server code name and numeric code when the server produced the error,
/// otherwise the driver's error kind.
fn driver_error_name(err: &mongodb::error::Error) -> (String, Option<i32>) {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) if !cmd.code_name.is_empty() => {
            (cmd.code_name.clone(), Some(cmd.code))
        }
        ErrorKind::Command(cmd) => ("CommandError".to_string(), Some(cmd.code)),
        ErrorKind::Write(WriteFailure::WriteError(write)) => (
            write
                .code_name
                .clone()
                .unwrap_or_else(|| "WriteError".to_string()),
            Some(write.code),
        ),
        ErrorKind::Write(WriteFailure::WriteConcernError(concern)) => {
            (concern.code_name.clone(), Some(concern.code))
        }
        kind => (kind_name(kind), None),
    }
}

/// Variant name of an `ErrorKind`, e.g. `ServerSelection`.
fn kind_name(kind: &ErrorKind) -> String {
    format!("{kind:?}")
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        let body = match self {
            ProxyError::MissingFields { missing, .. } => {
                tracing::debug!(?missing, "Rejected request with missing fields.");
                json!({ "acknowledged": false, "message": message, "missing": missing })
            }
            ProxyError::InvalidField { .. } | ProxyError::MalformedBody(_) => {
                tracing::debug!(%message, "Rejected malformed request.");
                json!({ "acknowledged": false, "message": message })
            }
            ProxyError::Database(db_err) => {
                let (name, code) = driver_error_name(&db_err);
                tracing::error!(error = %db_err, %name, "Database operation failed.");
                json!({
                    "acknowledged": false,
                    "message": "Database operation failed",
                    "error": {
                        "name": name,
                        "code": code,
                        "message": message,
                        "labels": db_err.labels(),
                    },
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
