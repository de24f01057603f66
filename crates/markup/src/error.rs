//! Error types for the markup compiler.

use thiserror::Error;

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, MarkupError>;

/// Reasons a markup string cannot be compiled.
///
/// Every variant is fatal: the compiler never returns a partial script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
	/// The input does not start with a `<Frame>` element.
	#[error("expected a root <Frame> element{}", found.as_ref().map(|f| format!(", found <{f}>")).unwrap_or_default())]
	MissingRoot { found: Option<String> },

	/// Structural problem (unterminated tag, bad attribute syntax, ...).
	#[error("malformed markup at byte {offset}: {message}")]
	Malformed { offset: usize, message: String },

	/// A recognised attribute carried a value of the wrong shape.
	#[error("invalid value {value:?} for `{attribute}` on <{element}>: expected {expected}")]
	InvalidValue {
		element: &'static str,
		attribute: String,
		value: String,
		expected: &'static str,
	},

	/// One unit of a batch failed to compile.
	#[error("markup unit {index}: {source}")]
	BatchUnit {
		index: usize,
		#[source]
		source: Box<MarkupError>,
	},
}

impl MarkupError {
	pub(crate) fn malformed(offset: usize, message: impl Into<String>) -> Self {
		MarkupError::Malformed {
			offset,
			message: message.into(),
		}
	}
}
