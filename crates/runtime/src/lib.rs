//! Backend channel for the log viewer.
//!
//! Launches the indexer process, frames JSON messages over its stdio pipes and
//! correlates responses with the requests that caused them. Events pushed by
//! the backend are fanned out to every subscriber of [`Connection::subscribe_events`].

pub mod connection;
pub mod error;
pub mod fake_transport;
pub mod process;
pub mod transport;

pub use connection::Connection;
pub use error::{Error, Result};
pub use fake_transport::{FakeTransportBuilder, FakeTransportController};
pub use process::BackendProcess;
pub use transport::{PipeTransport, Transport, TransportParts, TransportReceiver};
