use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shadow store request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub meta: RequestMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DocumentData>,
}

/// Request metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMeta {
    pub id: Uuid,
    pub method: Method,
    /// Name of the thing whose shadow is addressed
    pub thing: String,
}

/// Shadow store response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub meta: ResponseMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DocumentData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ApiError>>,
}

/// Response metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub id: Uuid,
    pub method: Method,
}

/// Document carried by get responses and update requests
///
/// The payload is a serialized JSON document, not a nested object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentData {
    pub payload: String,
}

/// API error structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub detail: String,
}

/// Shadow store methods
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Update,
}

impl Request {
    /// Create a new request for the given thing
    pub fn new(method: Method, thing: impl Into<String>) -> Self {
        Self {
            meta: RequestMeta {
                id: Uuid::new_v4(),
                method,
                thing: thing.into(),
            },
            data: None,
        }
    }

    /// Set the document payload
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.data = Some(DocumentData {
            payload: payload.into(),
        });
        self
    }

    /// Get the request ID
    pub fn id(&self) -> Uuid {
        self.meta.id
    }
}

impl Response {
    /// Check if the response contains errors
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Get the first error message, if any
    pub fn error_message(&self) -> Option<String> {
        self.errors
            .as_ref()
            .and_then(|e| e.first())
            .map(|e| e.detail.clone())
    }

    /// Into the document payload, if present
    pub fn into_payload(self) -> Option<String> {
        self.data.map(|d| d.payload)
    }
}

/// Responses a store would send, for driving a local test server
#[cfg(test)]
impl Response {
    /// Build a successful response to a request
    pub fn reply(request: &Request, data: Option<DocumentData>) -> Self {
        Self {
            meta: ResponseMeta {
                id: request.meta.id,
                method: request.meta.method,
            },
            data,
            errors: None,
        }
    }

    /// Build a failed response to a request
    pub fn failure(request: &Request, detail: impl Into<String>) -> Self {
        Self {
            meta: ResponseMeta {
                id: request.meta.id,
                method: request.meta.method,
            },
            data: None,
            errors: Some(vec![ApiError {
                detail: detail.into(),
            }]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_request_wire_shape() {
        let request = Request::new(Method::Update, "LeetoniaLinuxSystem").with_payload("{}");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["meta"]["method"], "update");
        assert_eq!(value["meta"]["thing"], "LeetoniaLinuxSystem");
        assert_eq!(value["meta"]["id"], json!(request.id().to_string()));
        assert_eq!(value["data"]["payload"], "{}");
    }

    #[test]
    fn get_request_omits_data() {
        let request = Request::new(Method::Get, "bridge");
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("data").is_none());
    }

    #[test]
    fn failure_reports_first_error() {
        let request = Request::new(Method::Get, "bridge");
        let response = Response::failure(&request, "No shadow exists with name: 'bridge'");
        assert!(response.has_errors());
        assert_eq!(
            response.error_message().as_deref(),
            Some("No shadow exists with name: 'bridge'")
        );
        assert_eq!(response.meta.id, request.id());
    }

    #[test]
    fn empty_error_list_is_not_an_error() {
        let response: Response = serde_json::from_value(json!({
            "meta": {"id": Uuid::new_v4(), "method": "get"},
            "data": {"payload": "{\"state\":{}}"},
            "errors": []
        }))
        .unwrap();
        assert!(!response.has_errors());
        assert_eq!(response.into_payload().as_deref(), Some("{\"state\":{}}"));
    }
}
