//! Transports: the collaborators that move request bytes to a worker and
//! bring one response back.

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::registry::MethodDescriptor;
use bytes::Bytes;
use pruntime_wire::{DelimitedDecoder, WireError, MAX_MESSAGE_SIZE};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Length-prefix framing of the bytes a transport carries.
///
/// Discrete exchanges (one request, one response) need none. Continuous
/// byte streams prefix each message with its varint length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Framing {
    /// Requests are prefixed with their varint length.
    pub request_delimited: bool,
    /// Responses carry a varint length prefix.
    pub response_delimited: bool,
}

impl Framing {
    /// Length prefixes in both directions.
    pub fn delimited() -> Self {
        Self {
            request_delimited: true,
            response_delimited: true,
        }
    }
}

/// Moves one encoded request to the worker and returns its response bytes.
///
/// The payload is already framed as [`Transport::framing`] declares, and the
/// response is returned exactly as received. Implementations own timeouts,
/// cancellation and backpressure; they must not retry on their own.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a request payload and awaits the response.
    async fn call(
        &self,
        method: &MethodDescriptor,
        payload: Bytes,
    ) -> Result<Bytes, TransportError>;

    /// Framing this transport expects on requests and produces on responses.
    fn framing(&self) -> Framing {
        Framing::default()
    }
}

/// An in-process transport backed by a closure.
pub struct FnTransport<F>
where
    F: Fn(&MethodDescriptor, Bytes) -> Result<Bytes, TransportError> + Send + Sync,
{
    handler: F,
    framing: Framing,
}

impl<F> FnTransport<F>
where
    F: Fn(&MethodDescriptor, Bytes) -> Result<Bytes, TransportError> + Send + Sync,
{
    /// Creates an unframed transport.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            framing: Framing::default(),
        }
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }
}

#[async_trait::async_trait]
impl<F> Transport for FnTransport<F>
where
    F: Fn(&MethodDescriptor, Bytes) -> Result<Bytes, TransportError> + Send + Sync + 'static,
{
    async fn call(
        &self,
        method: &MethodDescriptor,
        payload: Bytes,
    ) -> Result<Bytes, TransportError> {
        (self.handler)(method, payload)
    }

    fn framing(&self) -> Framing {
        self.framing
    }
}

/// Options of a [`StreamTransport`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Message framing. Without response delimiting the response runs
    /// until the peer closes the stream.
    pub framing: Framing,
    /// Time allowed for one write-and-read exchange.
    pub request_timeout: Duration,
    /// Largest response accepted.
    pub max_message_size: usize,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            framing: Framing::delimited(),
            request_timeout: Duration::from_secs(30),
            max_message_size: MAX_MESSAGE_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl StreamOptions {
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

impl From<&ClientConfig> for StreamOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            framing: config.framing(),
            request_timeout: config.request_timeout(),
            max_message_size: config.max_message_size,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

struct StreamState<S> {
    stream: S,
    decoder: DelimitedDecoder,
    /// Set while an exchange is in flight and left set if it does not
    /// complete. The stream position is unknown from then on.
    broken: bool,
}

/// A transport over a continuous byte stream (TCP, pipes).
///
/// Exchanges are serialised: one request is written and its response read
/// before the next request starts. With delimited responses, exactly one
/// frame is read per call and returned with its prefix.
///
/// An exchange that fails or times out after it started leaves the stream
/// unusable: a late reply would otherwise be read as the answer to the next
/// call. Every later call fails with [`TransportError::ConnectionClosed`].
pub struct StreamTransport<S> {
    state: Mutex<StreamState<S>>,
    options: StreamOptions,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, options: StreamOptions) -> Self {
        let decoder = DelimitedDecoder::with_max_message_size(options.max_message_size);
        Self {
            state: Mutex::new(StreamState {
                stream,
                decoder,
                broken: false,
            }),
            options,
        }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Whether an earlier exchange left the stream unusable.
    pub async fn is_broken(&self) -> bool {
        self.state.lock().await.broken
    }

    async fn exchange(
        &self,
        state: &mut StreamState<S>,
        payload: &[u8],
    ) -> Result<Bytes, TransportError> {
        let StreamState {
            stream, decoder, ..
        } = state;

        stream.write_all(payload).await?;
        stream.flush().await?;
        tracing::debug!("Wrote {} bytes, waiting for response...", payload.len());

        if self.options.framing.response_delimited {
            read_frame(stream, decoder, self.options.read_buffer_size).await
        } else {
            read_to_close(stream, self.options.max_message_size).await
        }
    }
}

impl StreamTransport<TcpStream> {
    /// Opens a TCP connection to the configured worker.
    pub async fn connect(config: &ClientConfig) -> Result<Self, TransportError> {
        tracing::debug!("Connecting to {}...", config.addr);

        let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(config.addr))
            .await
            .map_err(|_| {
                tracing::debug!("Connection timeout");
                TransportError::ConnectTimeout(config.connect_timeout())
            })?
            .map_err(|e| {
                tracing::debug!("Connection failed: {}", e);
                TransportError::Io(e)
            })?;

        stream.set_nodelay(true).ok();
        tracing::debug!("TCP connected to {}", config.addr);

        Ok(Self::new(stream, StreamOptions::from(config)))
    }
}

#[async_trait::async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn call(
        &self,
        method: &MethodDescriptor,
        payload: Bytes,
    ) -> Result<Bytes, TransportError> {
        let mut state = self.state.lock().await;
        if state.broken {
            return Err(TransportError::ConnectionClosed);
        }

        // Cleared only once the response has been read in full. A dropped
        // call future leaves it set too.
        state.broken = true;
        let timeout = self.options.request_timeout;
        let result = tokio::time::timeout(timeout, self.exchange(&mut state, &payload)).await;

        match result {
            Ok(Ok(response)) => {
                state.broken = false;
                Ok(response)
            }
            Ok(Err(e)) => {
                tracing::debug!("Request {} failed, stream abandoned: {}", method.name, e);
                state.decoder.clear();
                Err(e)
            }
            Err(_) => {
                tracing::debug!("Request {} timed out, stream abandoned", method.name);
                state.decoder.clear();
                Err(TransportError::Timeout(timeout))
            }
        }
    }

    fn framing(&self) -> Framing {
        self.options.framing
    }
}

async fn read_frame<S>(
    stream: &mut S,
    decoder: &mut DelimitedDecoder,
    buffer_size: usize,
) -> Result<Bytes, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    loop {
        if let Some(frame) = decoder.decode_frame()? {
            tracing::debug!("Decoded response frame ({} bytes)", frame.raw.len());
            return Ok(frame.raw);
        }

        let n = stream.read(&mut buf).await?;
        if n == 0 {
            tracing::debug!("Connection closed with {} bytes buffered", decoder.buffered());
            return Err(TransportError::ConnectionClosed);
        }
        decoder.extend(&buf[..n]);
    }
}

async fn read_to_close<S>(stream: &mut S, max_message_size: usize) -> Result<Bytes, TransportError>
where
    S: AsyncRead + Unpin,
{
    let mut response = Vec::new();
    let limit = (max_message_size as u64).saturating_add(1);
    stream.take(limit).read_to_end(&mut response).await?;
    if response.len() > max_message_size {
        return Err(WireError::MessageTooLarge {
            size: response.len() as u64,
            max: max_message_size,
        }
        .into());
    }
    Ok(Bytes::from(response))
}
