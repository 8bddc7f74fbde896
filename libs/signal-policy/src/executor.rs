//! Action Executor - immediate and delayed emission of rule actions
//!
//! Immediate actions are sent on the caller's task. Delayed actions are
//! handed to a spawned timer task that sleeps, sends, and exits. Timer tasks
//! share only the transport with the dispatcher; they never read or write
//! the state store and are never cancelled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::compiler::Action;
use crate::transport::{Signal, Transport};

#[derive(Debug, Clone)]
pub struct ActionExecutor {
    transport: Arc<dyn Transport>,
    pending: Arc<AtomicUsize>,
}

impl ActionExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Emit an action now, or schedule it when it carries a delay
    ///
    /// Returns the timer task handle for delayed actions. Must be called
    /// from within a tokio runtime when the action is delayed.
    pub fn execute(&self, rule_id: usize, action: &Action) -> Option<JoinHandle<()>> {
        let signal = Signal::new(action.signal.clone(), action.value.clone());

        let Some(delay) = action.delay() else {
            emit(self.transport.as_ref(), rule_id, &signal);
            return None;
        };

        debug!(
            "Rule #{}: scheduling {} in {}ms",
            rule_id,
            signal,
            delay.as_millis()
        );
        let transport = Arc::clone(&self.transport);
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::Relaxed);

        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            emit(transport.as_ref(), rule_id, &signal);
            pending.fetch_sub(1, Ordering::Relaxed);
        }))
    }

    /// Delayed actions scheduled but not yet sent
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

fn emit(transport: &dyn Transport, rule_id: usize, signal: &Signal) {
    match transport.send(signal) {
        Ok(()) => info!("Rule #{} emitted {}", rule_id, signal),
        Err(e) => error!("Rule #{}: failed to emit {}: {}", rule_id, signal, e),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use crate::value::Value;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn action(signal: &str, delay_ms: Option<u64>) -> Action {
        Action {
            signal: signal.to_string(),
            value: Value::Bool(true),
            delay_ms,
        }
    }

    #[tokio::test]
    async fn test_immediate_action_sends_synchronously() {
        let transport = Arc::new(MemoryTransport::new());
        let executor = ActionExecutor::new(transport.clone());

        assert!(executor.execute(0, &action("now", None)).is_none());
        assert_eq!(transport.sent_lines(), vec!["now=true".to_string()]);
        assert_eq!(executor.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_action_waits() {
        let transport = Arc::new(MemoryTransport::new());
        let executor = ActionExecutor::new(transport.clone());
        let start = tokio::time::Instant::now();

        let handle = executor.execute(0, &action("later", Some(750))).unwrap();
        assert_eq!(executor.pending(), 1);
        assert!(transport.sent().is_empty());

        handle.await.unwrap();
        let sent = transport.sent_with_times();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0 - start >= Duration::from_millis(750));
        assert_eq!(executor.pending(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_send_failure_is_logged_not_propagated() {
        let transport = Arc::new(MemoryTransport::new());
        transport.set_fail_sends(true);
        let executor = ActionExecutor::new(transport.clone());

        executor.execute(3, &action("broken", None));
        assert!(logs_contain("Rule #3: failed to emit broken=true"));
    }
}
