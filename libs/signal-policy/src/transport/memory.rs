//! In-process transport
//!
//! Inbound lines are pushed through an unbounded channel; every outbound
//! signal is recorded with the (tokio) instant it was sent. Used by tests and
//! by embedders that drive the dispatcher from their own task.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use super::line::parse_line;
use super::traits::{Inbound, Signal, Transport, TransportError};

#[derive(Debug)]
pub struct MemoryTransport {
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    inbound_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    sent: Mutex<Vec<(Instant, Signal)>>,
    fail_sends: AtomicBool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Queue one inbound line, parsed exactly like the line transport
    ///
    /// Returns `false` once input has been closed.
    pub fn push_line(&self, line: impl Into<String>) -> bool {
        match self.inbound_tx.lock().as_ref() {
            Some(tx) => tx.send(line.into()).is_ok(),
            None => false,
        }
    }

    /// Queue several inbound lines
    pub fn push_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.push_line(line);
        }
    }

    /// End of input: `receive` reports `Terminate` once the queue drains
    pub fn close_input(&self) {
        self.inbound_tx.lock().take();
    }

    /// Make subsequent sends fail
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Signals sent so far, in send order
    pub fn sent(&self) -> Vec<Signal> {
        self.sent.lock().iter().map(|(_, s)| s.clone()).collect()
    }

    /// Signals sent so far with their send instants
    pub fn sent_with_times(&self) -> Vec<(Instant, Signal)> {
        self.sent.lock().clone()
    }

    /// Signals sent so far in wire form
    pub fn sent_lines(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, s)| s.to_string()).collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn send(&self, signal: &Signal) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(TransportError::SendFailed(format!(
                "memory: rejected '{}'",
                signal
            )));
        }
        self.sent.lock().push((Instant::now(), signal.clone()));
        Ok(())
    }

    async fn receive(&self) -> Result<Inbound, TransportError> {
        let mut rx = self.inbound_rx.lock().await;
        loop {
            match rx.recv().await {
                Some(line) => {
                    if let Some(inbound) = parse_line(&line) {
                        return Ok(inbound);
                    }
                },
                None => {
                    debug!("memory: input closed");
                    return Ok(Inbound::Terminate);
                },
            }
        }
    }
}
