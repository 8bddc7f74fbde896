//! Transport Layer Module
//!
//! Separates signal I/O from the dispatch logic.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │               Dispatcher                 │
//! └──────────────────────────────────────────┘
//!          │ receive()          ▲ send()
//!          ▼                    │
//! ┌──────────────────────────────────────────┐
//! │        Transport Interface (Trait)       │
//! └──────────────────────────────────────────┘
//!          │
//!     ┌────┴──────────┬───────────────┐
//!     ▼               ▼               ▼
//! ┌─────────┐   ┌───────────┐   ┌───────────┐
//! │  stdio  │   │  replay   │   │  memory   │
//! └─────────┘   └───────────┘   └───────────┘
//! ```
//!
//! `stdio` and `replay` are selectable by name; `memory` is built in code.

pub mod factory;
pub mod line;
pub mod memory;
pub mod traits;

pub use factory::{create_transport, TransportKind, DEFAULT_TRANSPORT};
pub use line::{LineTransport, ReplayTransport, StdioTransport, ThreadedReader};
pub use memory::MemoryTransport;
pub use traits::{Inbound, Signal, Transport, TransportError, TERMINATE_TOKEN};
