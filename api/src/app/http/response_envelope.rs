//! JSON envelope for every reply of the search service.
//!
//! `{ "success": true, "data": .. }` or `{ "success": false, "error": .. }`.
//! The envelope carries the status it is sent with, so handlers and the
//! rejection middleware never pair a body with the wrong code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable code clients switch on, e.g. `INDEX_NOT_READY`.
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldIssue>,
}

/// Points at the request field that was rejected.
#[derive(Debug, Default, Serialize)]
pub struct FieldIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl FieldIssue {
    pub fn field(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            hint: None,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// `200 OK` with `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Envelope<()> {
    pub fn failure(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            data: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
                details: Vec::new(),
            }),
        }
    }

    pub fn with_issue(mut self, issue: FieldIssue) -> Self {
        if let Some(body) = self.error.as_mut() {
            body.details.push(issue);
        }
        self
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
