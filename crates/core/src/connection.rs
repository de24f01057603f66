//! Request/response correlation over a [`TransportParts`].
//!
//! Every request gets a fresh id and a oneshot slot in the callback map. A
//! dispatch task reads inbound messages: responses complete the slot with the
//! matching id (in whatever order the target answers), events go to the event
//! channel handed out by [`Connection::new`]. When the inbound side ends, all
//! pending requests fail and the connection reports closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use figbridge_protocol::{EvaluateParams, EvaluateResult, Event, Message, RUNTIME_EVALUATE, Request};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::transport::TransportParts;

type CallbackMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// Removes the pending slot when a request future finishes or is dropped.
struct PendingGuard<'a> {
	id: u64,
	callbacks: &'a CallbackMap,
}

impl Drop for PendingGuard<'_> {
	fn drop(&mut self) {
		self.callbacks.lock().remove(&self.id);
	}
}

/// Debugging-protocol connection to one target.
pub struct Connection {
	last_id: AtomicU64,
	callbacks: CallbackMap,
	outbound: Mutex<Option<mpsc::UnboundedSender<Value>>>,
	open: Arc<AtomicBool>,
}

impl Connection {
	/// Starts dispatching `parts` and returns the connection with its event stream.
	///
	/// Must be called inside a tokio runtime.
	pub fn new(parts: TransportParts) -> (Self, mpsc::UnboundedReceiver<Event>) {
		let TransportParts { sender, receiver } = parts;
		let callbacks: CallbackMap = Arc::new(Mutex::new(HashMap::new()));
		let open = Arc::new(AtomicBool::new(true));
		let (event_tx, event_rx) = mpsc::unbounded_channel();

		tokio::spawn(dispatch_loop(
			receiver,
			Arc::clone(&callbacks),
			event_tx,
			Arc::clone(&open),
		));

		let connection = Self {
			last_id: AtomicU64::new(0),
			callbacks,
			outbound: Mutex::new(Some(sender)),
			open,
		};
		(connection, event_rx)
	}

	/// Whether the transport is still usable.
	pub fn is_open(&self) -> bool {
		self.open.load(Ordering::SeqCst) && self.outbound.lock().is_some()
	}

	/// Sends `method` and waits for its response.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
		let request = serde_json::to_value(Request {
			id,
			method: method.to_string(),
			params,
		})?;

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);
		let _guard = PendingGuard {
			id,
			callbacks: &self.callbacks,
		};

		if !self.open.load(Ordering::SeqCst) {
			return Err(closed());
		}
		let queued = match self.outbound.lock().as_ref() {
			Some(outbound) => outbound.send(request).is_ok(),
			None => false,
		};
		if !queued {
			return Err(closed());
		}
		trace!(target = "figbridge.transport", id, method, "request sent");

		rx.await.map_err(|_| closed())?
	}

	/// `Runtime.evaluate`, mapping a thrown exception to [`Error::Evaluation`].
	pub async fn evaluate(&self, params: EvaluateParams) -> Result<Value> {
		let raw = self.send(RUNTIME_EVALUATE, serde_json::to_value(params)?).await?;
		let result: EvaluateResult = serde_json::from_value(raw)?;
		match result.exception_details {
			Some(details) => Err(Error::Evaluation(details.message())),
			None => Ok(result.result.into_value()),
		}
	}

	/// Closes the transport and fails pending requests. Idempotent.
	pub fn close(&self) {
		let had_sender = self.outbound.lock().take().is_some();
		self.open.store(false, Ordering::SeqCst);
		fail_pending(&self.callbacks);
		if had_sender {
			debug!(target = "figbridge.transport", "connection closed");
		}
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		self.close();
	}
}

fn closed() -> Error {
	Error::Transport("connection closed".to_string())
}

fn fail_pending(callbacks: &CallbackMap) {
	let pending: Vec<_> = callbacks.lock().drain().collect();
	for (_, tx) in pending {
		let _ = tx.send(Err(closed()));
	}
}

async fn dispatch_loop(
	mut inbound: mpsc::UnboundedReceiver<Value>,
	callbacks: CallbackMap,
	events: mpsc::UnboundedSender<Event>,
	open: Arc<AtomicBool>,
) {
	while let Some(value) = inbound.recv().await {
		match serde_json::from_value::<Message>(value) {
			Ok(message) => dispatch(message, &callbacks, &events),
			Err(err) => warn!(target = "figbridge.transport", error = %err, "failed to parse message"),
		}
	}
	open.store(false, Ordering::SeqCst);
	fail_pending(&callbacks);
	debug!(target = "figbridge.transport", "inbound stream ended");
}

fn dispatch(message: Message, callbacks: &CallbackMap, events: &mpsc::UnboundedSender<Event>) {
	match message {
		Message::Response(response) => {
			let Some(callback) = callbacks.lock().remove(&response.id) else {
				debug!(target = "figbridge.transport", id = response.id, "response for unknown request (ignored)");
				return;
			};
			let result = match response.error {
				Some(error) => Err(Error::Protocol(format!("{} (code {})", error.message, error.code))),
				None => Ok(response.result.unwrap_or(Value::Null)),
			};
			let _ = callback.send(result);
		}
		Message::Event(event) => {
			trace!(target = "figbridge.transport", method = %event.method, "event");
			let _ = events.send(event);
		}
		Message::Unknown(value) => {
			debug!(target = "figbridge.transport", %value, "unknown message (ignored)");
		}
	}
}
