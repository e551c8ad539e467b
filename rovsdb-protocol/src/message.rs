//! JSON-RPC message envelopes and inbound classification.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A request or notification envelope.
///
/// `id: None` marks a notification, which the peer must not answer. The
/// member is always serialized (as JSON `null` when absent) because that is
/// the shape peers emit and expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Json>,
    #[serde(default)]
    pub id: Option<String>,
}

impl Request {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Vec<Json>) -> Self {
        Self {
            method: method.into(),
            params,
            id: Some(id.into()),
        }
    }

    pub fn notification(method: impl Into<String>, params: Vec<Json>) -> Self {
        Self {
            method: method.into(),
            params,
            id: None,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A response envelope.
///
/// Exactly one of `result`/`error` is meaningful, but both members are
/// always serialized (the unused one as `null`): peers classify an inbound
/// message as a response by the presence of both keys, so dropping the null
/// member would make our replies unrecognizable to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub result: Json,
    #[serde(default)]
    pub error: Json,
    #[serde(default)]
    pub id: Option<String>,
}

impl Response {
    pub fn ok(id: impl Into<String>, result: Json) -> Self {
        Self {
            result,
            error: Json::Null,
            id: Some(id.into()),
        }
    }

    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            result: Json::Null,
            error: Json::String(message.into()),
            id: Some(id.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_null()
    }

    /// The failure reason, verbatim. String errors come back as-is; any
    /// other non-null JSON is rendered compactly.
    pub fn error_text(&self) -> Option<String> {
        match &self.error {
            Json::Null => None,
            Json::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// One classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    /// Classifies one inbound JSON document.
    ///
    /// A message carrying an `id` member and *both* `result` and `error`
    /// members (null or not) is a response; otherwise a message carrying a
    /// `method` member is a request or notification. Requiring both reply
    /// members is stricter than JSON-RPC demands, but it matches the peer
    /// servers this client talks to; a server that omits the null member
    /// would have its replies rejected here rather than misfiled.
    pub fn classify(json: Json) -> Result<Self, ProtocolError> {
        let obj = match &json {
            Json::Object(obj) => obj,
            other => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "not an object: {other}"
                )))
            }
        };
        if obj.contains_key("id")
            && obj.contains_key("result")
            && obj.contains_key("error")
        {
            let response: Response = serde_json::from_value(json)?;
            Ok(Message::Response(response))
        } else if obj.contains_key("method") {
            let request: Request = serde_json::from_value(json)?;
            Ok(Message::Request(request))
        } else {
            Err(ProtocolError::InvalidMessage(format!(
                "neither request nor response: {json}"
            )))
        }
    }
}
