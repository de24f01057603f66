//! Websocket transport to a single debugging target.
//!
//! The socket is split into a writer task fed by an unbounded channel and a
//! reader task that forwards decoded JSON frames. [`Connection`] only ever
//! sees the channel ends ([`TransportParts`]), so tests can drive it without
//! a socket.
//!
//! [`Connection`]: crate::connection::Connection

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::error::Result;

/// Channel ends of an open transport.
pub struct TransportParts {
	/// Outbound messages. Dropping every sender closes the socket.
	pub sender: mpsc::UnboundedSender<Value>,
	/// Inbound messages. Yields `None` once the socket is gone.
	pub receiver: mpsc::UnboundedReceiver<Value>,
}

/// Opens a websocket to `url` and starts its reader and writer tasks.
pub async fn connect(url: &str) -> Result<TransportParts> {
	debug!(target = "figbridge.transport", url, "opening websocket");
	let (stream, _) = connect_async(url).await?;
	let (mut sink, mut source) = stream.split();

	let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
	let (in_tx, in_rx) = mpsc::unbounded_channel::<Value>();

	tokio::spawn(async move {
		while let Some(message) = out_rx.recv().await {
			if let Err(err) = sink.send(WsMessage::Text(message.to_string())).await {
				warn!(target = "figbridge.transport", error = %err, "websocket write failed");
				break;
			}
		}
		let _ = sink.close().await;
		debug!(target = "figbridge.transport", "writer finished");
	});

	tokio::spawn(async move {
		while let Some(frame) = source.next().await {
			match frame {
				Ok(WsMessage::Text(text)) => match serde_json::from_str::<Value>(&text) {
					Ok(value) => {
						if in_tx.send(value).is_err() {
							break;
						}
					}
					Err(err) => {
						warn!(target = "figbridge.transport", error = %err, "dropping undecodable frame");
					}
				},
				Ok(WsMessage::Close(frame)) => {
					debug!(target = "figbridge.transport", ?frame, "peer closed websocket");
					break;
				}
				Ok(_) => {}
				Err(err) => {
					warn!(target = "figbridge.transport", error = %err, "websocket read failed");
					break;
				}
			}
		}
		debug!(target = "figbridge.transport", "reader finished");
	});

	Ok(TransportParts {
		sender: out_tx,
		receiver: in_rx,
	})
}
