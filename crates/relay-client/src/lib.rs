//! # relay-client
//!
//! Single-connection terminal client for the relay: forwards input lines
//! to the server and prints every line the server sends back.

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod errors;

pub use client::{Client, ClientExit};
pub use config::ClientConfig;
pub use errors::ClientError;
