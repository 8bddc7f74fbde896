//! Dispatcher - the single-task evaluation loop
//!
//! Per inbound update: write the state store, look up the rules that read
//! the signal, evaluate each in declaration order and hand the actions of
//! those that hold to the executor.
//!
//! ```text
//!            receive()
//!   Idle ──────────────▶ Dispatching(signal) ──┐
//!    ▲                                         │
//!    └─────────────────────────────────────────┘
//!   quit / end of input ──▶ close handshake ──▶ stopped
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::compiler::RuleSet;
use crate::evaluator::evaluate;
use crate::executor::ActionExecutor;
use crate::state::StateStore;
use crate::transport::{Inbound, Signal, Transport, TransportError};
use crate::value::Value;

/// Outcome of dispatching one signal update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub signal: String,
    /// Rules whose condition was evaluated
    pub evaluated: usize,
    /// Ids of the rules that fired, in evaluation order
    pub fired: Vec<usize>,
    /// Rules left undetermined (missing signal or type mismatch)
    pub undetermined: usize,
}

impl DispatchReport {
    fn new(signal: &str) -> Self {
        Self {
            signal: signal.to_string(),
            ..Self::default()
        }
    }
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Dispatched(DispatchReport),
    Queried(Option<Value>),
    Terminated,
}

pub struct Dispatcher {
    rules: RuleSet,
    state: StateStore,
    executor: ActionExecutor,
    transport: Arc<dyn Transport>,
    updates: u64,
}

impl Dispatcher {
    pub fn new(rules: RuleSet, state: StateStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            rules,
            executor: ActionExecutor::new(Arc::clone(&transport)),
            state,
            transport,
            updates: 0,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// Signal updates dispatched so far
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Write `signal` and evaluate every rule that depends on it
    pub fn dispatch(&mut self, signal: &str, value: Value) -> DispatchReport {
        debug!("Dispatching {}={}", signal, value.to_literal());
        self.state.set(signal, value);
        self.updates += 1;
        debug!("State: {}", self.state);

        let mut report = DispatchReport::new(signal);
        for rule in self.rules.dependents(signal) {
            report.evaluated += 1;
            match evaluate(&rule.condition, &self.state) {
                Ok(true) => {
                    info!("Rule #{} matched: {}", rule.id, rule.condition);
                    report.fired.push(rule.id);
                    let _ = self.executor.execute(rule.id, &rule.action);
                },
                Ok(false) => {
                    debug!("Rule #{} not matched: {}", rule.id, rule.condition);
                },
                Err(e) if e.is_type_mismatch() => {
                    warn!("Rule #{} undetermined: {}", rule.id, e);
                    report.undetermined += 1;
                },
                Err(e) => {
                    debug!("Rule #{} undetermined: {}", rule.id, e);
                    report.undetermined += 1;
                },
            }
        }

        if report.evaluated > 0 {
            debug!(
                "{}: evaluated {} rules, fired {}, undetermined {}",
                signal,
                report.evaluated,
                report.fired.len(),
                report.undetermined
            );
        }
        report
    }

    /// Current value of `signal`, echoed to the log; the store is untouched
    pub fn query(&self, signal: &str) -> Option<&Value> {
        let value = self.state.get(signal);
        match value {
            Some(v) => info!("{} = {}", signal, v.to_literal()),
            None => info!("{} has no value", signal),
        }
        value
    }

    /// Handle one inbound message
    ///
    /// On [`Inbound::Terminate`] the close handshake is sent.
    pub fn handle(&mut self, inbound: Inbound) -> Step {
        match inbound {
            Inbound::Signal {
                name,
                value: Some(raw),
            } => Step::Dispatched(self.dispatch(&name, Value::coerce(&raw))),
            Inbound::Signal { name, value: None } => Step::Queried(self.query(&name).cloned()),
            Inbound::Terminate => {
                self.close();
                Step::Terminated
            },
        }
    }

    /// Send the empty-signal close handshake
    pub fn close(&self) {
        if let Err(e) = self.transport.send(&Signal::close()) {
            warn!("Failed to send close handshake: {}", e);
        }
    }

    /// Receive and handle inbound signals until terminated
    ///
    /// Pending delayed actions keep running after this returns, for as long
    /// as the runtime does.
    pub async fn run(&mut self) -> Result<(), TransportError> {
        info!(
            "Dispatcher running on {} transport: {} rules, {} signals in state",
            self.transport.name(),
            self.rules.len(),
            self.state.len()
        );

        loop {
            let inbound = self.transport.receive().await?;
            if self.handle(inbound) == Step::Terminated {
                break;
            }
        }

        info!(
            "Dispatcher stopped after {} updates ({} delayed actions pending)",
            self.updates,
            self.executor.pending()
        );
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rules", &self.rules.len())
            .field("state", &self.state.len())
            .field("transport", &self.transport.name())
            .field("updates", &self.updates)
            .finish()
    }
}
