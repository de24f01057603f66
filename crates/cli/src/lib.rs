//! Command line and daemon for figbridge.
//!
//! The daemon owns one [`figbridge::SessionManager`] and exposes it on a
//! loopback HTTP surface; every other command is a thin client of it.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod error;
pub mod logging;
