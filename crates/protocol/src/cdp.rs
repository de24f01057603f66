//! Remote debugging protocol messages.
//!
//! Outbound messages are `{id, method, params}`. Inbound messages are either
//! responses (`{id, result}` or `{id, error}`) correlated by `id`, or events
//! (`{method, params}`) which carry no `id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method enabling execution-context notifications.
pub const RUNTIME_ENABLE: &str = "Runtime.enable";
/// Method evaluating an expression in a context.
pub const RUNTIME_EVALUATE: &str = "Runtime.evaluate";
/// Event announcing a new execution context.
pub const EXECUTION_CONTEXT_CREATED: &str = "Runtime.executionContextCreated";
/// Event announcing that every execution context was torn down.
pub const EXECUTION_CONTEXTS_CLEARED: &str = "Runtime.executionContextsCleared";

/// Request sent to the debugging endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Unique (per connection) request id.
	pub id: u64,
	pub method: String,
	#[serde(default)]
	pub params: Value,
}

/// Response to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Id of the request this answers.
	pub id: u64,
	/// Success payload (mutually exclusive with `error`).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Protocol-level failure (unknown method, bad params, ...).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ProtocolError>,
}

/// Error object carried by a failed [`Response`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolError {
	#[serde(default)]
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<String>,
}

/// Unsolicited notification from the debugging endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	pub method: String,
	#[serde(default)]
	pub params: Value,
}

/// Discriminated union of inbound messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Has an `id`.
	Response(Response),
	/// Has a `method` and no `id`.
	Event(Event),
	/// Anything else (forward-compatible catch-all).
	Unknown(Value),
}

/// One entry of the endpoint's `/json/list` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
	pub id: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub url: String,
	/// `page`, `iframe`, `service_worker`, ...
	#[serde(rename = "type", default)]
	pub kind: String,
	/// Absent when another client is already attached.
	#[serde(default)]
	pub web_socket_debugger_url: Option<String>,
}

/// Params of [`EXECUTION_CONTEXT_CREATED`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContextCreated {
	pub context: ExecutionContextDescription,
}

/// Descriptor of a scripting context inside the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDescription {
	pub id: i64,
	#[serde(default)]
	pub origin: String,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aux_data: Option<Value>,
}

/// Params of [`RUNTIME_EVALUATE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
	pub expression: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub context_id: Option<i64>,
	pub await_promise: bool,
	pub return_by_value: bool,
	#[serde(skip_serializing_if = "std::ops::Not::not", default)]
	pub silent: bool,
}

impl EvaluateParams {
	/// Evaluation with promise awaiting and by-value results, as used for
	/// every figbridge call.
	pub fn new(expression: impl Into<String>, context_id: i64) -> Self {
		Self {
			expression: expression.into(),
			context_id: Some(context_id),
			await_promise: true,
			return_by_value: true,
			silent: false,
		}
	}

	/// Suppress exception reporting in the target (best-effort probes).
	pub fn silent(mut self) -> Self {
		self.silent = true;
		self
	}
}

/// Result of [`RUNTIME_EVALUATE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
	pub result: RemoteObject,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exception_details: Option<ExceptionDetails>,
}

/// Mirror of a value living in the target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subtype: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub class_name: Option<String>,
	/// Present for by-value results.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

impl RemoteObject {
	/// The JSON value of this object; `undefined` and unserializable values map to `null`.
	pub fn into_value(self) -> Value {
		self.value.unwrap_or(Value::Null)
	}
}

/// Details of an exception thrown by an evaluated expression.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub line_number: i64,
	#[serde(default)]
	pub column_number: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
	/// The most descriptive message the target provided.
	///
	/// Prefers the thrown object's description (e.g. `Error: node not found\n
	/// at ...`), then its by-value payload (for thrown strings), then the
	/// generic exception text (e.g. `Uncaught`).
	pub fn message(&self) -> String {
		if let Some(exception) = &self.exception {
			if let Some(description) = exception.description.as_deref().filter(|d| !d.is_empty()) {
				return description.to_string();
			}
			match &exception.value {
				Some(Value::String(s)) => return s.clone(),
				Some(Value::Null) | None => {}
				Some(other) => return other.to_string(),
			}
		}
		self.text.clone()
	}
}
