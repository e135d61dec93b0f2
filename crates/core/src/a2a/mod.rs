//! # Service Protocol
//!
//! How the coordinator and the worker services talk.
//!
//! ```text
//! coordinator                                   worker
//!     │  GET /.well-known/agent.json   ──────►    │   ServiceRegistry (TTL cache)
//!     │  ◄──────────────  ServiceCard              │
//!     │  POST /api/send_message        ──────►    │   RemoteClient (timeout + retry)
//!     │  ◄──────────────  MessageResponse          │
//! ```

pub mod card;
pub mod client;
pub mod envelope;
pub mod registry;
pub mod wire;

pub use card::{CardEndpoints, ServiceCard, SEND_MESSAGE_PATH, WELL_KNOWN_PATH};
pub use client::RemoteClient;
pub use envelope::{Attachment, Envelope, Part, Role};
pub use registry::ServiceRegistry;
pub use wire::{MessageParams, MessageResponse, SendMessageRequest};
