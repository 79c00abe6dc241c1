//! # linesub
//!
//! `linesub` is a minimalist, in-memory publish/subscribe broker built with
//! Rust. It speaks a line-oriented protocol over plain TCP: publishers
//! connect, declare a topic, and send text messages; subscribers connect,
//! declare a topic, and receive every message published to it.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `broker`: the central component that manages topics, subscribers, and message fan-out.
//! - `client`: represents a connected subscriber on the server side.
//! - `config`: handles loading and managing server configuration.
//! - `transport`: the TCP server, the handshake protocol, and the per-connection lifecycle.
//! - `utils`: shared utilities, such as error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
