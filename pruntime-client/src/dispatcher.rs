//! Unary RPC dispatcher.
//!
//! A call runs: look the method up, check and encode the request, hand the
//! bytes to the transport, decode and verify the response. Framing is
//! whatever the transport declares. All state is either immutable
//! (registry, schemas) or owned by the call, so one dispatcher serves any
//! number of concurrent calls.

use crate::error::RpcError;
use crate::registry::{MethodDescriptor, ServiceRegistry, PHACTORY_API};
use crate::transport::{Framing, Transport};
use bytes::Bytes;
use pruntime_wire::{
    decode, decode_delimited, encode, encode_delimited, verify, Record, SchemaViolation,
    ViolationReason, WireError,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Dispatches calls of one service over a transport.
///
/// Request and response framing follow [`Transport::framing`].
pub struct Dispatcher {
    registry: &'static ServiceRegistry,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    /// Creates a `PhactoryAPI` dispatcher.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: &PHACTORY_API,
            transport,
        }
    }

    pub fn with_registry(mut self, registry: &'static ServiceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &'static ServiceRegistry {
        self.registry
    }

    /// Framing used on the wire, as declared by the transport.
    pub fn framing(&self) -> Framing {
        self.transport.framing()
    }

    // =========================================================================
    // Calling conventions
    // =========================================================================

    /// Calls `method` and resolves to its verified response.
    pub async fn call(&self, method: &str, request: &Record) -> Result<Record, RpcError> {
        self.invoke(method, request).await
    }

    /// Calls `method` on a spawned task and hands the outcome to `callback`.
    ///
    /// The callback runs exactly once, on the spawned task.
    pub fn call_with_callback<F>(
        self: &Arc<Self>,
        method: &str,
        request: Record,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<Record, RpcError>) + Send + 'static,
    {
        let dispatcher = Arc::clone(self);
        let method = method.to_string();
        tokio::spawn(async move {
            let result = dispatcher.invoke(&method, &request).await;
            callback(result);
        })
    }

    // =========================================================================
    // Core
    // =========================================================================

    async fn invoke(&self, method: &str, request: &Record) -> Result<Record, RpcError> {
        let descriptor = self
            .registry
            .method(method)
            .ok_or_else(|| RpcError::UnknownMethod(method.to_string()))?;

        let payload = self.encode_request(descriptor, request)?;
        tracing::debug!(
            "Calling {} ({} request bytes)",
            self.registry.full_name(descriptor),
            payload.len()
        );

        let response = self
            .transport
            .call(descriptor, payload)
            .await
            .map_err(|e| {
                tracing::warn!("{} transport failure: {}", descriptor.name, e);
                RpcError::Transport(e)
            })?;
        tracing::debug!("{} returned {} bytes", descriptor.name, response.len());

        let record = self.decode_response(descriptor, &response).map_err(|e| {
            tracing::warn!("{} response rejected: {}", descriptor.name, e);
            e
        })?;
        Ok(record)
    }

    fn encode_request(
        &self,
        descriptor: &MethodDescriptor,
        request: &Record,
    ) -> Result<Bytes, RpcError> {
        let schema = request.schema();
        if !schema.is(descriptor.request) {
            return Err(SchemaViolation::new(
                schema.name,
                ViolationReason::SchemaMismatch {
                    expected: descriptor.request.name,
                    found: schema.name,
                },
            )
            .into());
        }

        let encoded = if self.framing().request_delimited {
            encode_delimited(request)?
        } else {
            encode(request)?
        };
        Ok(encoded.freeze())
    }

    fn decode_response(
        &self,
        descriptor: &MethodDescriptor,
        bytes: &[u8],
    ) -> Result<Record, RpcError> {
        let record = if self.framing().response_delimited {
            let (record, used) = decode_delimited(descriptor.response, bytes)?;
            if used != bytes.len() {
                return Err(WireError::TrailingBytes {
                    offset: used,
                    count: bytes.len() - used,
                }
                .into());
            }
            record
        } else {
            decode(descriptor.response, bytes)?
        };
        verify(&record)?;
        Ok(record)
    }
}
