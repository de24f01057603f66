//! Owns the current session and applies the retry policy.
//!
//! The manager holds at most one session. Concurrent callers that need a
//! connection share a single in-flight connect attempt (a shared future), so
//! two sessions are never constructed at once and every waiter observes the
//! same outcome.
//!
//! Execution timeouts race the local caller against the clock; they do not
//! cancel the remote evaluation, which may still complete its side effects
//! after the caller has seen [`Error::ExecutionTimeout`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use figbridge_markup::{compile, compile_batch};
use figbridge_protocol::{ExecRequest, HealthResponse};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::{EXISTENCE_PROBE, RetryPolicy};
use crate::error::{Error, Result};
use crate::session::{Connector, RemoteSession};

type ConnectFuture<S> = Shared<BoxFuture<'static, Result<Arc<S>>>>;

/// Outcome of a health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
	/// No session, or its transport is closed.
	Disconnected,
	/// Transport open, but the scripting root is unreachable.
	Unhealthy,
	Healthy,
}

impl Health {
	pub fn connected(self) -> bool {
		!matches!(self, Health::Disconnected)
	}

	pub fn healthy(self) -> bool {
		matches!(self, Health::Healthy)
	}
}

impl From<Health> for HealthResponse {
	fn from(health: Health) -> Self {
		HealthResponse::new(health.connected(), health.healthy())
	}
}

/// Counters for observing manager behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
	/// Connect attempts started.
	pub connects: u64,
	/// Sessions discarded by retries or explicit reconnects.
	pub forced_reconnects: u64,
}

/// Failure of [`SessionManager::execute`].
#[derive(Debug, Clone)]
pub struct ExecError {
	pub error: Error,
	/// Per-unit results of a batch up to and including the failing unit.
	pub partial: Option<Vec<Value>>,
}

impl From<Error> for ExecError {
	fn from(error: Error) -> Self {
		Self { error, partial: None }
	}
}

struct State<S> {
	current: Option<Arc<S>>,
	in_flight: Option<ConnectFuture<S>>,
}

struct Inner<C: Connector> {
	connector: C,
	policy: RetryPolicy,
	probe_timeout: Duration,
	state: Mutex<State<C::Session>>,
	connects: AtomicU64,
	forced_reconnects: AtomicU64,
}

/// Session lifecycle and retry policy. Cheap to clone; clones share state.
pub struct SessionManager<C: Connector> {
	inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for SessionManager<C> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<C: Connector> SessionManager<C> {
	pub fn new(connector: C, policy: RetryPolicy, probe_timeout: Duration) -> Self {
		Self {
			inner: Arc::new(Inner {
				connector,
				policy,
				probe_timeout,
				state: Mutex::new(State {
					current: None,
					in_flight: None,
				}),
				connects: AtomicU64::new(0),
				forced_reconnects: AtomicU64::new(0),
			}),
		}
	}

	pub fn connector(&self) -> &C {
		&self.inner.connector
	}

	pub fn policy(&self) -> RetryPolicy {
		self.inner.policy
	}

	pub fn stats(&self) -> ManagerStats {
		ManagerStats {
			connects: self.inner.connects.load(Ordering::SeqCst),
			forced_reconnects: self.inner.forced_reconnects.load(Ordering::SeqCst),
		}
	}

	/// Returns a healthy session, connecting if needed.
	///
	/// An unhealthy current session is closed and replaced. If a connect is
	/// already in flight, waits for it instead of starting another.
	pub async fn ensure_session(&self) -> Result<Arc<C::Session>> {
		let current = self.inner.state.lock().current.clone();
		let mut discarded = None;
		if let Some(session) = current {
			match self.probe(&*session).await {
				Health::Healthy => return Ok(session),
				health => {
					warn!(target = "figbridge.session", ?health, "session failed health probe; reconnecting");
					self.discard(&session).await;
					discarded = Some(session);
				}
			}
		}
		self.connect_shared(discarded.as_ref()).await
	}

	/// Reports on the current session without connecting.
	pub async fn health(&self) -> Health {
		let current = self.inner.state.lock().current.clone();
		match current {
			Some(session) => self.probe(&*session).await,
			None => Health::Disconnected,
		}
	}

	/// Drops the current session and connects afresh.
	pub async fn force_reconnect(&self) -> Result<Arc<C::Session>> {
		self.force_close().await;
		self.ensure_session().await
	}

	/// Closes the current session, leaving the manager disconnected.
	pub async fn shutdown(&self) {
		let session = self.inner.state.lock().current.take();
		if let Some(session) = session {
			session.close().await;
			info!(target = "figbridge.session", "session closed for shutdown");
		}
	}

	/// Runs `op` against a session under the retry policy.
	///
	/// Each attempt is bounded by the execution timeout. A failed attempt
	/// forces a reconnect and pauses before the next one; markup errors are
	/// returned at once. After the last attempt its error is returned.
	pub async fn execute_with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
	where
		F: FnMut(Arc<C::Session>) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let policy = self.inner.policy;
		let mut attempt = 0;
		loop {
			let outcome = match self.ensure_session().await {
				Ok(session) => match tokio::time::timeout(policy.exec_timeout, op(session)).await {
					Ok(result) => result,
					Err(_) => Err(Error::ExecutionTimeout(policy.exec_timeout)),
				},
				Err(err) => Err(err),
			};

			let err = match outcome {
				Ok(value) => return Ok(value),
				Err(err) if !err.is_retryable() => return Err(err),
				Err(err) => err,
			};
			if attempt + 1 >= policy.attempts() {
				warn!(target = "figbridge.session", attempts = policy.attempts(), error = %err, "giving up");
				return Err(err);
			}

			warn!(target = "figbridge.session", attempt, kind = err.kind(), error = %err, "attempt failed; forcing reconnect");
			self.force_close().await;
			tokio::time::sleep(policy.retry_delay).await;
			attempt += 1;
		}
	}

	/// Evaluates a raw script.
	pub async fn eval(&self, code: &str) -> Result<Value> {
		self.execute_with_retry(|session| async move { session.evaluate(code).await }).await
	}

	/// Compiles markup and evaluates the script. Markup errors never reach
	/// the target.
	pub async fn render(&self, markup: &str) -> Result<Value> {
		let script = compile(markup)?;
		self.eval(&script).await
	}

	/// Compiles every unit, then evaluates them one at a time.
	///
	/// Each unit gets its own retries, so a retry never repeats a unit that
	/// already succeeded. Nothing is rolled back on failure.
	pub async fn render_batch<S: AsRef<str>>(&self, units: &[S]) -> std::result::Result<Vec<Value>, ExecError> {
		let scripts = compile_batch(units).map_err(Error::from)?;
		let mut results = Vec::with_capacity(scripts.len());
		for (index, script) in scripts.iter().enumerate() {
			match self.eval(script).await {
				Ok(value) => results.push(value),
				Err(error) => {
					warn!(target = "figbridge.session", index, error = %error, "batch unit failed");
					results.push(json!({ "error": error.to_string() }));
					return Err(ExecError {
						error,
						partial: Some(results),
					});
				}
			}
		}
		Ok(results)
	}

	/// Dispatches one request-surface action.
	pub async fn execute(&self, request: &ExecRequest) -> std::result::Result<Value, ExecError> {
		debug!(target = "figbridge.session", action = request.action(), "execute");
		match request {
			ExecRequest::Eval { code } => Ok(self.eval(code).await?),
			ExecRequest::Render { jsx } => Ok(self.render(jsx).await?),
			ExecRequest::RenderBatch { jsx_array } => self.render_batch(jsx_array.as_slice()).await.map(Value::from),
		}
	}

	async fn probe(&self, session: &C::Session) -> Health {
		if !session.is_open() {
			return Health::Disconnected;
		}
		match tokio::time::timeout(self.inner.probe_timeout, session.evaluate(EXISTENCE_PROBE)).await {
			Ok(Ok(Value::Bool(true))) => Health::Healthy,
			Ok(Ok(other)) => {
				debug!(target = "figbridge.session", %other, "probe returned non-true");
				Health::Unhealthy
			}
			Ok(Err(err)) => {
				debug!(target = "figbridge.session", error = %err, "probe failed");
				Health::Unhealthy
			}
			Err(_) => {
				debug!(target = "figbridge.session", "probe timed out");
				Health::Unhealthy
			}
		}
	}

	/// Closes `session` and clears it if it is still current.
	async fn discard(&self, session: &Arc<C::Session>) {
		{
			let mut state = self.inner.state.lock();
			if state.current.as_ref().is_some_and(|c| Arc::ptr_eq(c, session)) {
				state.current = None;
			}
		}
		session.close().await;
	}

	async fn force_close(&self) {
		self.inner.forced_reconnects.fetch_add(1, Ordering::SeqCst);
		let session = self.inner.state.lock().current.take();
		if let Some(session) = session {
			session.close().await;
		}
	}

	/// Joins the in-flight connect, or starts one.
	///
	/// A current session other than `discarded` was installed by another
	/// caller while this one was probing, and is returned as is.
	async fn connect_shared(&self, discarded: Option<&Arc<C::Session>>) -> Result<Arc<C::Session>> {
		let attempt = {
			let mut state = self.inner.state.lock();
			if let Some(current) = &state.current {
				if !discarded.is_some_and(|stale| Arc::ptr_eq(stale, current)) {
					debug!(target = "figbridge.session", "session already replaced by another caller");
					return Ok(Arc::clone(current));
				}
			}
			match &state.in_flight {
				Some(in_flight) => {
					debug!(target = "figbridge.session", "joining in-flight connect");
					in_flight.clone()
				}
				None => {
					let attempt = Self::start_connect(Arc::clone(&self.inner));
					state.in_flight = Some(attempt.clone());
					attempt
				}
			}
		};
		attempt.await
	}

	fn start_connect(inner: Arc<Inner<C>>) -> ConnectFuture<C::Session> {
		async move {
			inner.connects.fetch_add(1, Ordering::SeqCst);
			info!(target = "figbridge.session", "connecting");
			let result = inner.connector.connect().await.map(Arc::new);
			let previous = {
				let mut state = inner.state.lock();
				state.in_flight = None;
				match &result {
					Ok(session) => state.current.replace(Arc::clone(session)),
					Err(_) => None,
				}
			};
			if let Some(previous) = previous {
				warn!(target = "figbridge.session", "closing session left current during connect");
				previous.close().await;
			}
			match &result {
				Ok(_) => info!(target = "figbridge.session", "connected"),
				Err(err) => warn!(target = "figbridge.session", kind = err.kind(), error = %err, "connect failed"),
			}
			result
		}
		.boxed()
		.shared()
	}
}

#[cfg(test)]
mod tests;
