//! Wire types for the log indexer backend protocol.
//!
//! This crate contains the serde-serializable types exchanged with the backend
//! indexing process. These types represent the "protocol layer" - the shapes of
//! data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Paired: every request names the response type that answers it
//! * Stable: Changes only when the wire protocol changes
//!
//! Correlation, transports and session orchestration are built on top of these
//! types in `lv-runtime` and `lv-core`.

pub mod envelope;
pub mod events;
pub mod messages;

pub use envelope::*;
pub use events::*;
pub use messages::*;
