//! Request and response records exchanged with the backend.
//!
//! Wire shape is `{ "id", "path", "body" }` for both directions; requests
//! may also carry the HTTP `method` the backend observed. In JSON the body
//! is encoded as standard base64.

use serde::{Deserialize, Serialize};

use crate::id::RequestId;

/// A pending request fetched from the backend.
///
/// Immutable once observed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ApiRequest {
    /// Correlation token assigned by the backend.
    pub id: RequestId,

    /// HTTP method, if the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Path as seen by the backend, not normalised.
    pub path: String,

    /// Raw request body.
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
}

impl ApiRequest {
    /// Create a request without a method.
    pub fn new(
        id: impl Into<RequestId>,
        path: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: id.into(),
            method: None,
            path: path.into(),
            body: body.into(),
        }
    }

    /// Attach the HTTP method the backend observed.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// A handler's answer, addressed to the caller of the originating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ApiResponse {
    /// Must equal the originating request's id.
    pub id: RequestId,

    /// Path of the originating request.
    pub path: String,

    /// Response body produced by the handler.
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Build the response to `request`, copying its id and path.
    #[must_use]
    pub fn answering(request: &ApiRequest, body: Vec<u8>) -> Self {
        Self {
            id: request.id.clone(),
            path: request.path.clone(),
            body,
        }
    }
}

mod body_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}
