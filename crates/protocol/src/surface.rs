//! Bodies of the daemon's local request surface.
//!
//! - `GET /health` → [`HealthResponse`]
//! - `GET /reconnect` → [`ReconnectResponse`]
//! - `POST /exec` with [`ExecRequest`] → [`ExecResponse`]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Liveness report of the daemon's current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
	/// Always `"ok"` when the daemon itself answered.
	pub status: String,
	/// A session exists and its transport is open.
	pub connected: bool,
	/// `connected` and the session passed the existence probe.
	pub healthy: bool,
}

impl HealthResponse {
	pub fn new(connected: bool, healthy: bool) -> Self {
		Self {
			status: "ok".to_string(),
			connected,
			healthy,
		}
	}
}

/// Failure description returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Stable snake_case error tag, e.g. `evaluation` or `markup_syntax`.
	pub kind: String,
	/// Human-readable message sourced from the innermost error.
	pub message: String,
}

impl ErrorBody {
	pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			message: message.into(),
		}
	}
}

/// Outcome of `GET /reconnect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorBody>,
}

impl ReconnectResponse {
	pub fn connected() -> Self {
		Self {
			status: Some("connected".to_string()),
			error: None,
		}
	}

	pub fn failed(error: ErrorBody) -> Self {
		Self {
			status: None,
			error: Some(error),
		}
	}
}

/// Body of `POST /exec`, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ExecRequest {
	/// Evaluate a raw script.
	Eval { code: String },
	/// Compile one markup unit and evaluate it.
	Render { jsx: String },
	/// Compile and evaluate several markup units, one after another.
	RenderBatch {
		#[serde(rename = "jsxArray")]
		jsx_array: Vec<String>,
	},
}

impl ExecRequest {
	/// Name of the action as it appears on the wire.
	pub fn action(&self) -> &'static str {
		match self {
			ExecRequest::Eval { .. } => "eval",
			ExecRequest::Render { .. } => "render",
			ExecRequest::RenderBatch { .. } => "renderBatch",
		}
	}
}

/// Body returned by `POST /exec`.
///
/// Successful calls carry only `result`. Failed calls carry `error`; a failed
/// batch also carries the partial `result` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorBody>,
}

impl ExecResponse {
	pub fn ok(result: Value) -> Self {
		Self {
			result: Some(result),
			error: None,
		}
	}

	pub fn failed(error: ErrorBody) -> Self {
		Self {
			result: None,
			error: Some(error),
		}
	}

	pub fn partial(result: Value, error: ErrorBody) -> Self {
		Self {
			result: Some(result),
			error: Some(error),
		}
	}
}
