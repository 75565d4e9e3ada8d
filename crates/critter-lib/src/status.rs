//! Observable bot status for a chat session.

use tokio::sync::watch;
use tracing::debug;

use critter_core::status::{BotStatus, StatusMachine};

use crate::error::Result;

/// [`StatusMachine`] that publishes every accepted transition on a watch
/// channel.
#[derive(Debug)]
pub struct StatusTracker {
    machine: StatusMachine,
    tx: watch::Sender<BotStatus>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(BotStatus::Idle);
        Self {
            machine: StatusMachine::new(),
            tx,
        }
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> BotStatus {
        self.machine.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<BotStatus> {
        self.tx.subscribe()
    }

    pub fn advance(&mut self, to: BotStatus) -> Result<BotStatus> {
        let from = self.machine.state();
        self.machine.advance(to)?;
        debug!("status: {from} -> {to}");
        self.tx.send_replace(to);
        Ok(to)
    }

    /// Back to idle unless already there.
    pub fn settle(&mut self) -> Result<()> {
        if self.machine.state().is_busy() {
            self.advance(BotStatus::Idle)?;
        }
        Ok(())
    }

    /// Force idle without checking the transition. Teardown only.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.tx.send_replace(BotStatus::Idle);
    }
}
