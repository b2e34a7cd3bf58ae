//! Transport layer between the client and the backend process.
//!
//! A transport is split in two halves so the writer and the reader can live on
//! different tasks: a [`Transport`] that sends JSON frames and a
//! [`TransportReceiver`] that pumps incoming frames into an unbounded channel
//! until the peer goes away.
//!
//! [`PipeTransport`] frames each JSON message with a 4-byte little-endian
//! length prefix, which is what the indexer speaks over its stdio pipes.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Frames larger than this are treated as a protocol violation.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Sending half of a transport.
pub trait Transport: Send {
	/// Sends one JSON message to the backend.
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport.
pub trait TransportReceiver: Send {
	/// Reads messages until the peer closes, forwarding each into the parts' `message_rx`.
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both halves of a transport plus the channel incoming messages arrive on.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<JsonValue>,
}

/// Length-prefixed JSON transport over a pair of byte pipes.
pub struct PipeTransport;

impl PipeTransport {
	/// Builds transport parts writing to `writer` (backend stdin) and reading from `reader` (backend stdout).
	pub fn new<W, R>(writer: W, reader: R) -> TransportParts
	where
		W: AsyncWrite + Unpin + Send + 'static,
		R: AsyncRead + Unpin + Send + 'static,
	{
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		TransportParts {
			sender: Box::new(PipeSender { writer }),
			receiver: Box::new(PipeReceiver { reader, message_tx }),
			message_rx,
		}
	}
}

struct PipeSender<W> {
	writer: W,
}

impl<W> Transport for PipeSender<W>
where
	W: AsyncWrite + Unpin + Send + 'static,
{
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move {
			let bytes = serde_json::to_vec(&message)?;
			let len = u32::try_from(bytes.len())
				.ok()
				.filter(|len| *len <= MAX_FRAME_LEN)
				.ok_or_else(|| Error::ProtocolError(format!("frame too large: {} bytes", bytes.len())))?;

			self.writer
				.write_u32_le(len)
				.await
				.map_err(|e| Error::Transport(format!("failed to write frame header: {e}")))?;
			self.writer
				.write_all(&bytes)
				.await
				.map_err(|e| Error::Transport(format!("failed to write frame: {e}")))?;
			self.writer
				.flush()
				.await
				.map_err(|e| Error::Transport(format!("failed to flush frame: {e}")))?;
			Ok(())
		})
	}
}

struct PipeReceiver<R> {
	reader: R,
	message_tx: mpsc::UnboundedSender<JsonValue>,
}

impl<R> TransportReceiver for PipeReceiver<R>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	fn run(mut self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		Box::pin(async move {
			loop {
				let len = match self.reader.read_u32_le().await {
					Ok(len) => len,
					Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
						debug!(target = "lv.backend", "backend pipe closed");
						return Ok(());
					}
					Err(e) => return Err(Error::Transport(format!("failed to read frame header: {e}"))),
				};

				if len > MAX_FRAME_LEN {
					return Err(Error::ProtocolError(format!("frame too large: {len} bytes")));
				}

				let mut buf = vec![0u8; len as usize];
				self.reader
					.read_exact(&mut buf)
					.await
					.map_err(|e| Error::Transport(format!("failed to read frame: {e}")))?;

				let message = match serde_json::from_slice::<JsonValue>(&buf) {
					Ok(message) => message,
					Err(e) => {
						warn!(target = "lv.backend", error = %e, "dropping malformed frame");
						continue;
					}
				};

				if self.message_tx.send(message).is_err() {
					return Ok(());
				}
			}
		})
	}
}
