//! Signal Policy - reactive condition/emit rule engine
//!
//! Ingests a stream of named signal updates, keeps the latest value of every
//! signal, and re-evaluates the rules that read a signal whenever it
//! changes:
//! - Rule compilation from YAML `condition` / `emit` blocks
//! - Three-valued condition evaluation (true / false / undetermined)
//! - Immediate and delayed action emission
//! - Pluggable line-oriented transports
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Transport  │────▶│  Dispatcher  │────▶│  StateStore  │
//! │  receive()  │     │  (one task)  │     │  (snapshot)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//!        ▲                   │
//!        │ send()            ▼
//! ┌─────────────┐     ┌──────────────┐
//! │  Executor   │◀────│  Evaluator   │
//! │(timer tasks)│     │ (dependents) │
//! └─────────────┘     └──────────────┘
//! ```
//!
//! Emitted signals go out through the transport only; they are never fed
//! back into the state store.

pub mod compiler;
mod dispatcher;
mod error;
mod evaluator;
mod executor;
pub mod expression;
mod loader;
mod state;
pub mod transport;
mod value;

// Re-export public API
pub use compiler::{Action, DependencyIndex, Rule, RuleSet};
pub use dispatcher::{DispatchReport, Dispatcher, Step};
pub use error::{EvalError, ParseError, Result, RuleError};
pub use evaluator::evaluate;
pub use executor::ActionExecutor;
pub use expression::{BoolOp, CompareOp, Expression};
pub use loader::{initial_state_from_str, load_initial_state, load_rules};
pub use state::StateStore;
pub use transport::{
    create_transport, Inbound, MemoryTransport, Signal, Transport, TransportError, TransportKind,
};
pub use value::Value;
