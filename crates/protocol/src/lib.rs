//! Wire types for figbridge.
//!
//! This crate contains the serde-serializable types exchanged on the two
//! channels figbridge speaks:
//!
//! - [`cdp`] - the target application's remote debugging endpoint (HTTP
//!   directory query plus JSON messages over a websocket)
//! - [`surface`] - the local request surface served by the figbridge daemon
//!
//! Types in this crate are pure data. Behaviour lives in `figbridge`.

pub mod cdp;
pub mod surface;

pub use cdp::*;
pub use surface::*;
