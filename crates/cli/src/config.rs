//! Optional JSON config file.
//!
//! Lives at `<config_dir>/figbridge/config.json` unless `--config` points
//! elsewhere. Every key is optional; command-line flags win over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figbridge::{BridgeConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::daemon::DEFAULT_PORT;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
	/// Loopback port of the request surface.
	pub port: u16,
	pub debug_host: String,
	pub debug_port: u16,
	pub url_patterns: Vec<String>,
	pub target: Option<String>,
	pub connect_timeout_ms: u64,
	pub settle_delay_ms: u64,
	pub probe_timeout_ms: u64,
	pub max_retries: u32,
	pub exec_timeout_ms: u64,
	pub retry_delay_ms: u64,
}

impl Default for FileConfig {
	fn default() -> Self {
		let bridge = BridgeConfig::default();
		let retry = RetryPolicy::default();
		Self {
			port: DEFAULT_PORT,
			debug_host: bridge.debug_host,
			debug_port: bridge.debug_port,
			url_patterns: bridge.url_patterns,
			target: bridge.target,
			connect_timeout_ms: bridge.connect_timeout.as_millis() as u64,
			settle_delay_ms: bridge.settle_delay.as_millis() as u64,
			probe_timeout_ms: bridge.probe_timeout.as_millis() as u64,
			max_retries: retry.max_retries,
			exec_timeout_ms: retry.exec_timeout.as_millis() as u64,
			retry_delay_ms: retry.retry_delay.as_millis() as u64,
		}
	}
}

impl FileConfig {
	/// Loads `explicit`, or the default location when `None`.
	///
	/// A missing default file yields defaults; a missing explicit file is an error.
	pub fn load(explicit: Option<&Path>) -> Result<Self> {
		match explicit {
			Some(path) => Self::read(path),
			None => match default_path() {
				Some(path) if path.exists() => Self::read(&path),
				_ => Ok(Self::default()),
			},
		}
	}

	fn read(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let config = serde_json::from_str(&text).map_err(|source| CliError::Config {
			path: path.to_path_buf(),
			source,
		})?;
		debug!(target = "figbridge.daemon", path = %path.display(), "loaded config file");
		Ok(config)
	}

	pub fn bridge(&self) -> BridgeConfig {
		BridgeConfig {
			debug_host: self.debug_host.clone(),
			debug_port: self.debug_port,
			url_patterns: self.url_patterns.clone(),
			target: self.target.clone(),
			connect_timeout: Duration::from_millis(self.connect_timeout_ms),
			settle_delay: Duration::from_millis(self.settle_delay_ms),
			probe_timeout: Duration::from_millis(self.probe_timeout_ms),
		}
	}

	pub fn retry(&self) -> RetryPolicy {
		RetryPolicy {
			max_retries: self.max_retries,
			exec_timeout: Duration::from_millis(self.exec_timeout_ms),
			retry_delay: Duration::from_millis(self.retry_delay_ms),
		}
	}
}

pub fn default_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("figbridge").join("config.json"))
}
