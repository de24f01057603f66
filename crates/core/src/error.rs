//! Error types for the bridge.

use std::time::Duration;

use figbridge_markup::MarkupError;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while connecting to or evaluating in the target application.
///
/// Every variant owns plain data so one connection attempt's outcome can be
/// handed to every task waiting on it.
#[derive(Debug, Clone, Error)]
pub enum Error {
	/// No open document matched the URL patterns or the selector.
	#[error("{0}")]
	NotFound(String),

	/// The connect sequence did not finish in time.
	#[error("timed out connecting to the target after {}ms", .0.as_millis())]
	ConnectionTimeout(Duration),

	/// No execution context exposes the scripting root object.
	#[error("could not find target context; try refreshing")]
	ContextNotFound,

	/// Evaluation was attempted without a discovered context.
	#[error("not connected to a target context")]
	NotConnected,

	/// The remote script raised. Carries the remote description verbatim.
	#[error("{0}")]
	Evaluation(String),

	/// Markup input was rejected by the compiler.
	#[error(transparent)]
	Markup(#[from] MarkupError),

	/// A single evaluation exceeded its time budget.
	#[error("execution timed out after {}ms", .0.as_millis())]
	ExecutionTimeout(Duration),

	/// Websocket failure or a closed channel.
	#[error("transport error: {0}")]
	Transport(String),

	/// Unexpected or unparseable protocol payload.
	#[error("protocol error: {0}")]
	Protocol(String),

	/// Directory query against the debugging endpoint failed.
	#[error("debugging endpoint request failed: {0}")]
	Http(String),
}

impl Error {
	/// Stable snake_case tag used in error bodies and logs.
	pub fn kind(&self) -> &'static str {
		match self {
			Error::NotFound(_) => "not_found",
			Error::ConnectionTimeout(_) => "connection_timeout",
			Error::ContextNotFound => "context_not_found",
			Error::NotConnected => "not_connected",
			Error::Evaluation(_) => "evaluation",
			Error::Markup(_) => "markup_syntax",
			Error::ExecutionTimeout(_) => "execution_timeout",
			Error::Transport(_) => "transport",
			Error::Protocol(_) => "protocol",
			Error::Http(_) => "http",
		}
	}

	/// Whether another attempt on a fresh session could succeed.
	///
	/// Markup errors are deterministic; everything else is treated as
	/// possibly transient, including remote script exceptions.
	pub fn is_retryable(&self) -> bool {
		!matches!(self, Error::Markup(_))
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Protocol(err.to_string())
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		Error::Http(err.to_string())
	}
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
	fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
		Error::Transport(err.to_string())
	}
}
