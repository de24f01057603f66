//! Connection and retry settings.

use std::time::Duration;

/// Default host of the app's remote debugging endpoint.
pub const DEFAULT_DEBUG_HOST: &str = "127.0.0.1";
/// Default port of the app's remote debugging endpoint.
pub const DEFAULT_DEBUG_PORT: u16 = 9222;
/// URL fragments identifying open design documents.
pub const DEFAULT_URL_PATTERNS: &[&str] = &["figma.com/design/", "figma.com/file/", "figma.com/board/"];
/// Expression that is `true` only in a context exposing the scripting root.
pub const EXISTENCE_PROBE: &str = "typeof figma !== 'undefined'";

/// Where and how to attach to the target application.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
	pub debug_host: String,
	pub debug_port: u16,
	/// A document is eligible when its URL contains any of these.
	pub url_patterns: Vec<String>,
	/// Case-insensitive title fragment (or exact id) picking one document.
	pub target: Option<String>,
	/// Bounds the whole connect sequence.
	pub connect_timeout: Duration,
	/// Wait after enabling runtime notifications before reading contexts.
	pub settle_delay: Duration,
	/// Bounds the existence probe used by health checks.
	pub probe_timeout: Duration,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			debug_host: DEFAULT_DEBUG_HOST.to_string(),
			debug_port: DEFAULT_DEBUG_PORT,
			url_patterns: DEFAULT_URL_PATTERNS.iter().map(|p| p.to_string()).collect(),
			target: None,
			connect_timeout: Duration::from_secs(10),
			settle_delay: Duration::from_secs(1),
			probe_timeout: Duration::from_secs(2),
		}
	}
}

impl BridgeConfig {
	/// Base URL of the debugging endpoint's HTTP directory.
	pub fn endpoint(&self) -> String {
		format!("http://{}:{}", self.debug_host, self.debug_port)
	}

	pub fn with_target(mut self, target: impl Into<String>) -> Self {
		self.target = Some(target.into());
		self
	}
}

/// Bounded retry with a forced reconnect between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Extra attempts after the first; `2` means three attempts in total.
	pub max_retries: u32,
	/// Per-attempt bound on a single evaluation.
	pub exec_timeout: Duration,
	/// Pause after a forced reconnect, letting the debugging port settle.
	pub retry_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 2,
			exec_timeout: Duration::from_secs(30),
			retry_delay: Duration::from_millis(500),
		}
	}
}

impl RetryPolicy {
	pub fn attempts(&self) -> u32 {
		self.max_retries + 1
	}
}
