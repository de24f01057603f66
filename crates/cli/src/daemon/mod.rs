//! The long-running process that owns the session.
//!
//! The daemon serves the request surface on loopback and records its pid in
//! a liveness file while it is up. The file is removed only after the
//! session has been closed, so its absence implies no live session.

mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
pub use server::{DaemonSettings, router, run, serve};
use tracing::{debug, warn};

pub const DEFAULT_PORT: u16 = 3456;

/// Returns the liveness file path for the current user.
///
/// Uses `$XDG_RUNTIME_DIR/figbridge.pid` if available, otherwise the
/// system temp directory.
pub fn pid_path() -> PathBuf {
	match std::env::var_os("XDG_RUNTIME_DIR") {
		Some(dir) if !dir.is_empty() => PathBuf::from(dir).join("figbridge.pid"),
		_ => std::env::temp_dir().join("figbridge.pid"),
	}
}

/// Reads the pid recorded at `path`, if the file exists and parses.
pub fn read_pid(path: &Path) -> Option<u32> {
	std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Liveness file that is removed when dropped.
#[derive(Debug)]
pub struct PidFile {
	path: PathBuf,
}

impl PidFile {
	pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
		let path = path.into();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.with_context(|| format!("Failed to create pid directory: {}", parent.display()))?;
		}
		std::fs::write(&path, std::process::id().to_string())
			.with_context(|| format!("Failed to write pid file: {}", path.display()))?;
		debug!(target = "figbridge.daemon", path = %path.display(), "pid file written");
		Ok(Self { path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl Drop for PidFile {
	fn drop(&mut self) {
		if let Err(err) = std::fs::remove_file(&self.path) {
			if err.kind() != std::io::ErrorKind::NotFound {
				warn!(target = "figbridge.daemon", path = %self.path.display(), error = %err, "failed to remove pid file");
			}
		}
	}
}
