use std::path::PathBuf;

use figbridge_protocol::ErrorBody;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("invalid config file {path}: {source}")]
	Config {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("cannot read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The daemon could not be reached at all.
	#[error("daemon not reachable at {url}; start it with `figbridge daemon`")]
	DaemonUnreachable {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	/// The daemon answered with an error body.
	#[error("[{}] {}", .0.kind, .0.message)]
	Remote(ErrorBody),

	#[error(transparent)]
	Markup(#[from] figbridge_markup::MarkupError),

	#[error(transparent)]
	Bridge(#[from] figbridge::Error),

	#[error(transparent)]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}
