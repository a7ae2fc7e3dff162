//! High-level client API.

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::RpcError;
use crate::registry::method;
use crate::schema::{ECHO_MESSAGE, EMPTY, GET_WORKER_STATE_REQUEST};
use crate::transport::{StreamTransport, Transport};
use bytes::Bytes;
use pruntime_wire::Record;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Typed client for the `PhactoryAPI` service of a pRuntime worker.
///
/// Every method resolves to the verified response record. Requests are
/// records of the method's request schema; see [`crate::schema`].
#[derive(Clone)]
pub struct PhactoryClient {
    dispatcher: Arc<Dispatcher>,
}

impl PhactoryClient {
    /// Creates a client over any transport, framed as the transport declares.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(transport)),
        }
    }

    /// Opens a TCP connection to the configured worker.
    pub async fn connect(config: &ClientConfig) -> Result<Self, RpcError> {
        let transport = StreamTransport::connect(config).await?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Returns the underlying dispatcher.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// Calls any method by name.
    pub async fn call(&self, method: &str, request: &Record) -> Result<Record, RpcError> {
        self.dispatcher.call(method, request).await
    }

    /// Calls any method by name and hands the outcome to `callback`.
    pub fn call_with_callback<F>(&self, method: &str, request: Record, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Record, RpcError>) + Send + 'static,
    {
        self.dispatcher.call_with_callback(method, request, callback)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Gets basic worker information (`PhactoryInfo`).
    pub async fn get_info(&self) -> Result<Record, RpcError> {
        self.call(method::GET_INFO, &Record::new(&EMPTY)).await
    }

    /// Gets the runtime info produced by initialisation (`InitRuntimeResponse`).
    pub async fn get_runtime_info(&self) -> Result<Record, RpcError> {
        self.call(method::GET_RUNTIME_INFO, &Record::new(&EMPTY)).await
    }

    /// Fetches pending egress messages (`GetEgressMessagesResponse`).
    pub async fn get_egress_messages(&self) -> Result<Record, RpcError> {
        self.call(method::GET_EGRESS_MESSAGES, &Record::new(&EMPTY))
            .await
    }

    // =========================================================================
    // Chain sync
    // =========================================================================

    /// Syncs relay chain headers (`HeadersToSync` → `SyncedTo`).
    pub async fn sync_header(&self, request: &Record) -> Result<Record, RpcError> {
        self.call(method::SYNC_HEADER, request).await
    }

    /// Syncs parachain headers (`ParaHeadersToSync` → `SyncedTo`).
    pub async fn sync_para_header(&self, request: &Record) -> Result<Record, RpcError> {
        self.call(method::SYNC_PARA_HEADER, request).await
    }

    /// Syncs relay and parachain headers together
    /// (`CombinedHeadersToSync` → `HeadersSyncedTo`).
    pub async fn sync_combined_headers(&self, request: &Record) -> Result<Record, RpcError> {
        self.call(method::SYNC_COMBINED_HEADERS, request).await
    }

    /// Dispatches blocks (`Blocks` → `SyncedTo`).
    pub async fn dispatch_blocks(&self, request: &Record) -> Result<Record, RpcError> {
        self.call(method::DISPATCH_BLOCKS, request).await
    }

    // =========================================================================
    // Runtime
    // =========================================================================

    /// Initialises the runtime (`InitRuntimeRequest` → `InitRuntimeResponse`).
    pub async fn init_runtime(&self, request: &Record) -> Result<Record, RpcError> {
        self.call(method::INIT_RUNTIME, request).await
    }

    /// Sends an encrypted contract query (`ContractQueryRequest` → `ContractQueryResponse`).
    pub async fn contract_query(&self, request: &Record) -> Result<Record, RpcError> {
        self.call(method::CONTRACT_QUERY, request).await
    }

    /// Gets the on-chain state of a worker (`WorkerState`).
    pub async fn get_worker_state(&self, public_key: impl Into<Bytes>) -> Result<Record, RpcError> {
        let request = Record::new(&GET_WORKER_STATE_REQUEST).with("public_key", public_key.into())?;
        self.call(method::GET_WORKER_STATE, &request).await
    }

    /// Round-trips bytes through the worker.
    pub async fn echo(&self, message: impl Into<Bytes>) -> Result<Bytes, RpcError> {
        let request = Record::new(&ECHO_MESSAGE).with("echo_msg", message.into())?;
        let response = self.call(method::ECHO, &request).await?;
        Ok(response.get_bytes("echo_msg").cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::registry::MethodDescriptor;
    use crate::schema::*;
    use crate::transport::FnTransport;
    use pruntime_wire::{decode, encode, Value};

    /// A fake worker that answers each method from its request.
    fn fake_worker(method: &MethodDescriptor, payload: Bytes) -> Result<Bytes, TransportError> {
        let response = match method.name {
            "Echo" => return Ok(payload),
            "GetInfo" => Record::new(&PHACTORY_INFO)
                .with("initialized", true)
                .unwrap()
                .with("headernum", 42u32)
                .unwrap()
                .with("version", "2.1.0")
                .unwrap(),
            "SyncHeader" => {
                let request = decode(&HEADERS_TO_SYNC, &payload).unwrap();
                let len = request.get_bytes("encoded_headers").map_or(0, |b| b.len());
                Record::new(&SYNCED_TO)
                    .with("synced_to", len as u32)
                    .unwrap()
            }
            "GetWorkerState" => {
                let request = decode(&GET_WORKER_STATE_REQUEST, &payload).unwrap();
                let registered = request.get_bytes("public_key").is_some();
                Record::new(&WORKER_STATE)
                    .with("registered", registered)
                    .unwrap()
            }
            _ => {
                return Err(TransportError::Status {
                    code: 404,
                    message: method.name.to_string(),
                })
            }
        };
        Ok(encode(&response).unwrap().freeze())
    }

    fn client() -> PhactoryClient {
        PhactoryClient::new(Arc::new(FnTransport::new(fake_worker)))
    }

    #[tokio::test]
    async fn test_echo() {
        let echoed = client().echo(vec![1u8, 2, 3]).await.unwrap();
        assert_eq!(&echoed[..], &[1, 2, 3]);

        let echoed = client().echo(Bytes::new()).await.unwrap();
        assert!(echoed.is_empty());
    }

    #[tokio::test]
    async fn test_get_info() {
        let info = client().get_info().await.unwrap();
        assert_eq!(info.get_bool("initialized"), Some(true));
        assert_eq!(info.get_u32("headernum"), Some(42));
        assert!(!info.has("genesis_block_hash"));
        assert_eq!(info.get_or_default("blocknum"), Some(Value::Uint32(0)));
    }

    #[tokio::test]
    async fn test_sync_header() {
        let request = Record::new(&HEADERS_TO_SYNC)
            .with("encoded_headers", vec![0u8; 10])
            .unwrap();
        let synced = client().sync_header(&request).await.unwrap();
        assert_eq!(synced.get_u32("synced_to"), Some(10));
    }

    #[tokio::test]
    async fn test_get_worker_state() {
        let state = client().get_worker_state(vec![0u8; 32]).await.unwrap();
        assert_eq!(state.get_bool("registered"), Some(true));
    }

    #[tokio::test]
    async fn test_remote_status_surfaces() {
        let err = client().get_runtime_info().await.unwrap_err();
        assert!(matches!(
            err,
            RpcError::Transport(TransportError::Status { code: 404, .. })
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_wrong_request_schema() {
        let err = client()
            .dispatch_blocks(&Record::new(&HEADERS_TO_SYNC))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::SchemaViolation(_)));
    }

    #[tokio::test]
    async fn test_callback_convention() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let request = Record::new(&ECHO_MESSAGE)
            .with("echo_msg", vec![8u8])
            .unwrap();
        client()
            .call_with_callback("Echo", request.clone(), move |result| {
                let _ = tx.send(result);
            })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap().unwrap(), request);
    }

    #[test]
    fn test_blocking_echo() {
        let echoed = tokio_test::block_on(client().echo(&b"sync"[..])).unwrap();
        assert_eq!(&echoed[..], b"sync");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop a listener to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig {
            addr,
            ..ClientConfig::default()
        };
        let err = PhactoryClient::connect(&config).await.err().unwrap();
        assert!(matches!(err, RpcError::Transport(_)));
        assert!(err.is_retryable());
    }
}
