//! figbridge - drive a running Figma desktop app over its debugging port
//!
//! - **Transport**: websocket to one document, split into channel ends
//! - **Connection**: request/response correlation by id, event routing
//! - **Discovery**: picking the document and the scripting context
//! - **Session**: one attachment, evaluates scripts in that context
//! - **Manager**: owns the current session, health probes, retries
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  SessionManager  │  single session, shared connect, retry policy
//! └────────┬─────────┘
//!          │ Connector / RemoteSession
//! ┌────────▼─────────┐
//! │    CdpSession    │  discovery + evaluate in context
//! │  ┌────────────┐  │
//! │  │ Connection │  │  id correlation
//! │  └────────────┘  │
//! │  ┌────────────┐  │
//! │  │ Transport  │  │  websocket
//! │  └────────────┘  │
//! └──────────────────┘
//! ```

pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod session;
pub mod transport;

pub use config::{BridgeConfig, EXISTENCE_PROBE, RetryPolicy};
pub use connection::Connection;
pub use error::{Error, Result};
pub use manager::{ExecError, Health, ManagerStats, SessionManager};
pub use session::{CdpConnector, CdpSession, Connector, RemoteSession};
pub use transport::TransportParts;
