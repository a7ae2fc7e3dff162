//! # pruntime-client
//!
//! Client library for pRuntime workers.
//!
//! This crate provides:
//! - The `PhactoryAPI` record schemas and method table
//! - A unary RPC dispatcher over a pluggable transport
//! - A stream transport for TCP workers, with optional length delimiting
//! - A typed high-level client for every `PhactoryAPI` method

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod schema;
pub mod transport;

pub use client::PhactoryClient;
pub use config::{ClientConfig, ConfigError};
pub use dispatcher::Dispatcher;
pub use error::{RpcError, TransportError};
pub use registry::{MethodDescriptor, ServiceRegistry, PHACTORY_API};
pub use transport::{FnTransport, Framing, StreamOptions, StreamTransport, Transport};
