//! # fah_client
//!
//! Protocol layer for monitoring a remote Folding@home client over its command
//! socket.
//!
//! ## Overview
//!
//! The client pushes state as a stream of PyON blocks:
//!
//! ```text
//! PyON 1 slots
//! [{"id": "00", "status": "RUNNING", "description": "cpu:15", ...}]
//! ---
//! ```
//!
//! This crate turns that stream into typed, queryable state:
//! - [`MessageExtractor`] frames blocks out of a buffer that may hold partial data
//! - [`convert`] maps loosely-typed wire values to timestamps, durations,
//!   addresses and status codes
//! - [`MessageCache`] keeps the latest payload per [`MessageKind`] and notifies
//!   subscribers on every update
//! - [`Binder`] resolves a requested Rust type to its kind through the
//!   [`MessageRegistry`] and materializes it from the cache
//! - [`ClientSession`] ties these together for one connection
//!
//! The crate performs no I/O. The owner of the socket feeds it bytes and
//! decides what to do when the connection fails.
//!
//! ## Quick Start
//!
//! ```rust
//! use fah_client::{ClientSession, Heartbeat, Slot, SlotStatus};
//!
//! let session = ClientSession::standard();
//! let mut updates = session.subscribe();
//!
//! session.update_from_text("PyON 1 heartbeat\n3\n---\nPyON 1 slots\n[{\"id\": \"00\", ");
//! session.update_from_text("\"status\": \"RUNNING\"}]\n---\n");
//!
//! assert_eq!(session.get::<Heartbeat>()?, Some(Heartbeat { value: 3 }));
//!
//! let slots = session.get_items::<Slot>()?.unwrap_or_default();
//! assert_eq!(slots[0].status, Some(SlotStatus::Running));
//!
//! assert_eq!(updates.try_recv().unwrap().key, fah_client::MessageKind::Heartbeat);
//! # Ok::<(), fah_client::MaterializeError>(())
//! ```

pub mod binder;
pub mod cache;
pub mod convert;
pub mod error;
pub mod extract;
pub mod fields;
pub mod kind;
pub mod log_sink;
pub mod message;
pub mod messages;
pub mod pyon;
pub mod registry;
pub mod session;

pub use binder::Binder;
pub use cache::{MessageCache, MessageUpdated};
pub use convert::SlotStatus;
pub use error::{BindError, ExtractError, FormatError, MaterializeError};
pub use extract::{Extraction, MessageExtractor};
pub use fields::{Fields, FromFields};
pub use kind::MessageKind;
pub use log_sink::{LogBuffer, LogSink, LogSnapshot};
pub use message::RawMessage;
pub use messages::{
    ClientInfo, Heartbeat, Info, LogRestart, LogUpdate, Options, SimulationInfo, Slot,
    SlotCollection, SlotOptions, SystemInfo, Unit, UnitCollection,
};
pub use registry::{
    AnyMessage, DynMessage, MessageCollection, MessageRegistry, Registration, TypedMessage,
};
pub use session::{ClientSession, UpdateReport};
