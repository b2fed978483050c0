//! JSON-RPC message decoding
//!
//! Turns raw frames into request envelopes. Syntax errors and shape errors
//! are kept apart so each gets its own error class.

use {
    crate::error::McpError,
    serde::{de::DeserializeOwned, Deserialize, Serialize},
    serde_json::{Map, Value},
};

/// Decoded request envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Absent for notifications
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Parse `params` into a method-specific type. Absent params read as `{}`.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T, McpError> {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        serde_json::from_value(params).map_err(|e| {
            McpError::InvalidParams(format!("Invalid {} params: {}", self.method, e))
        })
    }

    /// `params._meta.progressToken`, when the caller asked for progress
    pub fn progress_token(&self) -> Option<Value> {
        self.params
            .as_ref()
            .and_then(|p| p.get("_meta"))
            .and_then(|m| m.get("progressToken"))
            .cloned()
    }
}

/// Anything a peer may send
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Request(Request),
    /// A reply to a server-initiated request; nothing here sends those, so
    /// they are dropped
    Response { id: Value },
}

/// A message that could not be turned into an envelope.
///
/// Carries the id when one could be recovered, so the error response can be
/// matched by the peer.
#[derive(Debug)]
pub struct DecodeError {
    pub id: Option<Value>,
    pub method: Option<String>,
    pub error: McpError,
    /// Names a method and carries no `id`, so no response may be sent
    pub notification: bool,
}

impl DecodeError {
    fn new(message: &Value, error: McpError) -> Self {
        let method = message
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            id: message.get("id").filter(|id| is_valid_id(id)).cloned(),
            notification: method.is_some() && message.get("id").is_none(),
            method,
            error,
        }
    }

    pub fn to_json_rpc_error(&self) -> Value {
        self.error.to_json_rpc_error(self.id.clone())
    }
}

fn is_valid_id(id: &Value) -> bool {
    id.is_string() || id.is_number()
}

/// Parse bytes as JSON. Only syntax is checked here.
pub fn parse_frame(bytes: &[u8]) -> Result<Value, McpError> {
    serde_json::from_slice(bytes).map_err(|e| McpError::Parse(e.to_string()))
}

impl Incoming {
    pub fn from_value(message: &Value) -> Result<Self, DecodeError> {
        let Some(object) = message.as_object() else {
            let reason = if message.is_array() {
                "batch requests are not supported"
            } else {
                "message must be a JSON object"
            };
            return Err(DecodeError::new(
                message,
                McpError::InvalidRequest(reason.to_string()),
            ));
        };

        if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Err(DecodeError::new(
                message,
                McpError::InvalidRequest("jsonrpc must be \"2.0\"".to_string()),
            ));
        }

        let id = match object.get("id") {
            None => None,
            Some(id) if is_valid_id(id) => Some(id.clone()),
            Some(_) => {
                return Err(DecodeError::new(
                    message,
                    McpError::InvalidRequest("id must be a string or a number".to_string()),
                ))
            }
        };

        let method = match object.get("method") {
            Some(Value::String(method)) if !method.is_empty() => method.clone(),
            None if object.contains_key("result") || object.contains_key("error") => {
                return match id {
                    Some(id) => Ok(Incoming::Response { id }),
                    None => Err(DecodeError::new(
                        message,
                        McpError::InvalidRequest("response without id".to_string()),
                    )),
                };
            }
            _ => {
                return Err(DecodeError::new(
                    message,
                    McpError::InvalidRequest("method must be a non-empty string".to_string()),
                ))
            }
        };

        let params = match object.get("params") {
            None | Some(Value::Null) => None,
            Some(params @ Value::Object(_)) => Some(params.clone()),
            Some(_) => {
                return Err(DecodeError::new(
                    message,
                    McpError::InvalidParams("params must be an object".to_string()),
                ))
            }
        };

        Ok(Incoming::Request(Request { id, method, params }))
    }
}

/// Initialize method parameters
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(default)]
    pub client_info: Option<Value>,
}

/// Tool call parameters
#[derive(Debug, Deserialize, Serialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Resource read parameters
#[derive(Debug, Deserialize, Serialize)]
pub struct ResourceReadParams {
    pub uri: String,
}

/// Prompt get parameters
#[derive(Debug, Deserialize, Serialize)]
pub struct PromptGetParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}
