//! HTTP client for the daemon's request surface.

use figbridge_protocol::{ExecRequest, ExecResponse, HealthResponse, ReconnectResponse};
use serde::de::DeserializeOwned;

use crate::error::{CliError, Result};

#[derive(Debug, Clone)]
pub struct DaemonClient {
	base: String,
	http: reqwest::Client,
}

impl DaemonClient {
	/// Client for a daemon on loopback `port`.
	pub fn new(port: u16) -> Self {
		Self::with_base(format!("http://127.0.0.1:{port}"))
	}

	pub fn with_base(base: impl Into<String>) -> Self {
		Self {
			base: base.into().trim_end_matches('/').to_string(),
			http: reqwest::Client::new(),
		}
	}

	pub fn base(&self) -> &str {
		&self.base
	}

	pub async fn health(&self) -> Result<HealthResponse> {
		let request = self.http.get(self.url("/health"));
		self.send(request).await
	}

	/// Reconnect outcome; a failure arrives as a body with `error` set.
	pub async fn reconnect(&self) -> Result<ReconnectResponse> {
		let request = self.http.get(self.url("/reconnect"));
		self.send(request).await
	}

	/// Exec outcome; failures arrive as a body with `error` set.
	pub async fn exec(&self, exec: &ExecRequest) -> Result<ExecResponse> {
		let request = self.http.post(self.url("/exec")).json(exec);
		self.send(request).await
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base)
	}

	/// Error statuses still carry a JSON body, so the status is not checked.
	async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
		let response = request.send().await.map_err(|source| {
			if source.is_connect() {
				CliError::DaemonUnreachable {
					url: self.base.clone(),
					source,
				}
			} else {
				CliError::Http(source)
			}
		})?;
		Ok(response.json().await?)
	}
}
