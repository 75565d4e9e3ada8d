//! Bot status state machine.
//!
//! ```text
//! idle ──► listening ──► thinking ──► speaking ──► idle
//!   │          │            │   ▲
//!   │          └──► idle    │   └── idle (typed text)
//!   └──► speaking           └──► idle (nothing to say)
//! ```
//!
//! Anything not drawn above is rejected. While the bot is not idle it is
//! busy, and new submissions are turned away rather than queued.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
}

impl BotStatus {
    pub fn can_transition(self, to: BotStatus) -> bool {
        use BotStatus::*;
        matches!(
            (self, to),
            (Idle, Listening)
                | (Idle, Thinking)
                | (Idle, Speaking)
                | (Listening, Thinking)
                | (Listening, Idle)
                | (Thinking, Speaking)
                | (Thinking, Idle)
                | (Speaking, Idle)
        )
    }

    pub fn is_busy(self) -> bool {
        self != BotStatus::Idle
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BotStatus::Idle => "idle",
            BotStatus::Listening => "listening",
            BotStatus::Thinking => "thinking",
            BotStatus::Speaking => "speaking",
        }
    }

    /// Indicator line shown under the conversation, if any.
    pub fn indicator(self, persona_name: &str) -> Option<String> {
        match self {
            BotStatus::Idle => None,
            BotStatus::Listening => Some("Listening...".to_string()),
            BotStatus::Thinking => Some(format!("{persona_name} is pondering...")),
            BotStatus::Speaking => Some("Speaking...".to_string()),
        }
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: BotStatus,
    pub to: BotStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

/// Current status plus the transition rules.
#[derive(Debug, Clone, Default)]
pub struct StatusMachine {
    state: BotStatus,
}

impl StatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BotStatus {
        self.state
    }

    pub fn advance(&mut self, to: BotStatus) -> Result<BotStatus, InvalidTransition> {
        if !self.state.can_transition(to) {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(to)
    }

    /// Force back to idle from any state. Used on teardown paths.
    pub fn reset(&mut self) {
        self.state = BotStatus::Idle;
    }
}
