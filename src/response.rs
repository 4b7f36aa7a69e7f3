use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// One field-level problem reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldIssue>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta: None,
            errors: None,
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, errors: Vec<FieldIssue>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            meta: None,
            errors: (!errors.is_empty()).then_some(errors),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_omits_empty_fields() {
        let body = serde_json::to_value(ApiResponse::ok("done", 5)).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "done", "data": 5 }));
    }

    #[test]
    fn failure_envelope_carries_issues_only_when_present() {
        let bare = serde_json::to_value(ApiResponse::failure("nope", vec![])).unwrap();
        assert_eq!(bare, json!({ "success": false, "message": "nope" }));

        let issues = vec![FieldIssue::new("email", "Valid email is required")];
        let body = serde_json::to_value(ApiResponse::failure("Validation error", issues)).unwrap();
        assert_eq!(body["errors"][0]["path"], "email");
    }

    #[test]
    fn meta_is_serialized() {
        let body =
            serde_json::to_value(ApiResponse::ok("list", vec![1, 2]).with_meta(json!({ "total": 2 })))
                .unwrap();
        assert_eq!(body["meta"]["total"], 2);
    }
}
