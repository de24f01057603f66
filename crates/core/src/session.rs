//! One attachment to one document's scripting context.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use figbridge_protocol::{EvaluateParams, TargetDescriptor};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::connection::Connection;
use crate::discovery::{discover_context, list_targets, select_target};
use crate::error::{Error, Result};
use crate::transport::{self, TransportParts};

/// A live channel into the target's scripting context.
#[async_trait]
pub trait RemoteSession: Send + Sync + 'static {
	/// Whether the underlying transport is still open.
	fn is_open(&self) -> bool;

	/// Evaluates `expression`, awaiting a returned promise, and returns the
	/// result by value.
	async fn evaluate(&self, expression: &str) -> Result<Value>;

	/// Releases the transport. Safe to call repeatedly.
	async fn close(&self);
}

/// Produces fresh sessions for the [`SessionManager`](crate::SessionManager).
#[async_trait]
pub trait Connector: Send + Sync + 'static {
	type Session: RemoteSession;

	async fn connect(&self) -> Result<Self::Session>;
}

struct Attached {
	connection: Arc<Connection>,
	context_id: i64,
}

/// [`RemoteSession`] over the debugging protocol.
pub struct CdpSession {
	target: TargetDescriptor,
	attached: Mutex<Option<Attached>>,
}

impl CdpSession {
	/// Discovers, opens and attaches, bounded by `config.connect_timeout`.
	///
	/// Expiry anywhere in the sequence yields [`Error::ConnectionTimeout`].
	pub async fn connect(config: &BridgeConfig, http: &reqwest::Client) -> Result<Self> {
		let budget = config.connect_timeout;
		match tokio::time::timeout(budget, Self::discover_and_attach(config, http)).await {
			Ok(result) => result,
			Err(_) => {
				warn!(target = "figbridge.session", timeout_ms = budget.as_millis() as u64, "connect timed out");
				Err(Error::ConnectionTimeout(budget))
			}
		}
	}

	async fn discover_and_attach(config: &BridgeConfig, http: &reqwest::Client) -> Result<Self> {
		let targets = list_targets(http, &config.endpoint()).await?;
		let target = select_target(&targets, &config.url_patterns, config.target.as_deref())?.clone();
		let url = target
			.web_socket_debugger_url
			.clone()
			.ok_or_else(|| Error::NotFound(format!("document \"{}\" is already being debugged", target.title)))?;
		let parts = transport::connect(&url).await?;
		Self::attach(target, parts, config.settle_delay).await
	}

	/// Finishes the connect sequence over an already-open transport.
	pub async fn attach(target: TargetDescriptor, parts: TransportParts, settle: Duration) -> Result<Self> {
		let (connection, mut events) = Connection::new(parts);
		let context_id = match discover_context(&connection, &mut events, settle).await {
			Ok(id) => id,
			Err(err) => {
				connection.close();
				return Err(err);
			}
		};
		info!(target = "figbridge.session", title = %target.title, context_id, "attached");
		Ok(Self {
			target,
			attached: Mutex::new(Some(Attached {
				connection: Arc::new(connection),
				context_id,
			})),
		})
	}

	/// The document this session is attached to.
	pub fn target(&self) -> &TargetDescriptor {
		&self.target
	}

	pub fn context_id(&self) -> Option<i64> {
		self.attached.lock().as_ref().map(|a| a.context_id)
	}
}

#[async_trait]
impl RemoteSession for CdpSession {
	fn is_open(&self) -> bool {
		self.attached.lock().as_ref().is_some_and(|a| a.connection.is_open())
	}

	async fn evaluate(&self, expression: &str) -> Result<Value> {
		let (connection, context_id) = {
			let attached = self.attached.lock();
			let attached = attached.as_ref().ok_or(Error::NotConnected)?;
			(Arc::clone(&attached.connection), attached.context_id)
		};
		connection.evaluate(EvaluateParams::new(expression, context_id)).await
	}

	async fn close(&self) {
		let Some(attached) = self.attached.lock().take() else {
			return;
		};
		attached.connection.close();
		debug!(target = "figbridge.session", title = %self.target.title, "session closed");
	}
}

/// [`Connector`] that attaches to the configured debugging endpoint.
pub struct CdpConnector {
	config: BridgeConfig,
	http: reqwest::Client,
}

impl CdpConnector {
	pub fn new(config: BridgeConfig) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(config.connect_timeout)
			.build()?;
		Ok(Self { config, http })
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}
}

#[async_trait]
impl Connector for CdpConnector {
	type Session = CdpSession;

	async fn connect(&self) -> Result<CdpSession> {
		CdpSession::connect(&self.config, &self.http).await
	}
}
