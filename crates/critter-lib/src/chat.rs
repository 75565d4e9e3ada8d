//! Chat session — one conversation with one persona.
//!
//! Drives the turn cycle for typed and spoken input:
//!
//! ```text
//! submit_text:  log ─► thinking ─► (reply delay) ─► reply ─► speak ─► idle
//! submit_audio: listening ─► thinking ─► transcribe ─► reply ─► speak ─► idle
//! ```
//!
//! Submissions while the bot is busy are turned away with [`Error::Busy`].
//! Speech is stopped on [`ChatSession::close`] and on drop.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use critter_core::persona::{ChatTable, Persona, VoiceOutput};
use critter_core::reply::{Category, ReplySelector};
use critter_core::session::SessionId;
use critter_core::status::BotStatus;
use critter_core::text_prep::normalize_input;
use critter_core::types::Message;

use crate::error::{Error, Result};
use crate::speech::{AudioOutput, HostedTts, Speaker, Spoken};
use crate::status::StatusTracker;
use crate::stt::AudioClip;

/// Shown when a recording could not be turned into text.
pub const APOLOGY: &str = "Sorry, I couldn't understand that.";

/// Remote side of a chat: transcript logging, transcription and hosted TTS.
pub trait ChatBackend: HostedTts {
    fn log_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Transcribe `clip`. The server logs the text itself.
    fn transcribe(
        &self,
        clip: &AudioClip,
        session: &SessionId,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Transcribed text, for audio submissions that were understood.
    pub heard: Option<String>,
    pub reply: String,
    pub category: Option<Category>,
    pub spoken: Spoken,
    /// Something the user should be told, e.g. no way to play audio.
    pub notice: Option<String>,
}

pub struct ChatSession<B, A: AudioOutput> {
    persona: &'static Persona,
    table: &'static ChatTable,
    selector: &'static ReplySelector,
    session: SessionId,
    messages: Vec<Message>,
    status: StatusTracker,
    reply_delay: Duration,
    muted: bool,
    closed: bool,
    backend: B,
    speaker: Speaker<A>,
}

impl<B: ChatBackend, A: AudioOutput> ChatSession<B, A> {
    /// Start a conversation with `persona`. The intro is the first message.
    pub fn new(persona: &'static Persona, backend: B, audio: A) -> Result<Self> {
        let (Some(table), Some(selector)) = (persona.chat.as_ref(), persona.selector()) else {
            return Err(Error::Validation(format!(
                "{} is not available for chat yet",
                persona.name
            )));
        };

        let session = SessionId::generate(persona.tag());
        info!("chat: {} session {session}", persona.slug);

        Ok(Self {
            persona,
            table,
            selector,
            session,
            messages: vec![Message::bot(table.intro)],
            status: StatusTracker::new(),
            reply_delay: Duration::from_millis(table.reply_delay_ms),
            muted: false,
            closed: false,
            backend,
            speaker: Speaker::new(audio),
        })
    }

    pub fn persona(&self) -> &'static Persona {
        self.persona
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> BotStatus {
        self.status.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<BotStatus> {
        self.status.subscribe()
    }

    pub fn accepts_voice(&self) -> bool {
        self.table.voice_input
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_reply_delay(&mut self, delay: Duration) {
        self.reply_delay = delay;
    }

    /// Speak the intro line.
    pub async fn announce(&mut self) -> Result<Turn> {
        self.ensure_idle()?;
        let intro = self.table.intro;
        let (spoken, notice) = self.speak(intro).await?;
        Ok(Turn {
            heard: None,
            reply: intro.to_string(),
            category: None,
            spoken,
            notice,
        })
    }

    /// Send a typed message and wait for the bot's reply.
    pub async fn submit_text(&mut self, text: &str) -> Result<Turn> {
        let text = normalize_input(text)
            .ok_or_else(|| Error::Validation("message is empty".into()))?;
        self.ensure_idle()?;

        self.messages.push(Message::user(text));
        if let Err(e) = self.backend.log_message(&self.session, text).await {
            warn!("chat: failed to log message for {}: {e}", self.session);
        }

        self.status.advance(BotStatus::Thinking)?;
        self.respond(text, None).await
    }

    /// Send a recorded clip. Transcription failures yield the apology turn
    /// rather than an error.
    pub async fn submit_audio(&mut self, clip: AudioClip) -> Result<Turn> {
        if !self.table.voice_input {
            return Err(Error::Validation(format!(
                "{} does not take voice input",
                self.persona.name
            )));
        }
        self.ensure_idle()?;

        self.status.advance(BotStatus::Listening)?;
        debug!("chat: {} bytes captured from {}", clip.bytes.len(), clip.file_name);
        self.status.advance(BotStatus::Thinking)?;

        let heard = match self.backend.transcribe(&clip, &self.session).await {
            Ok(text) => normalize_input(&text).map(str::to_string),
            Err(e) => {
                warn!("chat: transcription failed: {e}");
                None
            }
        };

        let Some(heard) = heard else {
            self.messages.push(Message::bot(APOLOGY));
            self.status.settle()?;
            return Ok(Turn {
                heard: None,
                reply: APOLOGY.to_string(),
                category: None,
                spoken: Spoken::Silent,
                notice: None,
            });
        };

        self.messages.push(Message::user(heard.as_str()));
        self.respond(&heard, Some(heard.clone())).await
    }

    /// Cut off any speech in progress.
    pub fn stop(&self) {
        self.speaker.stop();
    }

    /// Recover after a turn future was dropped before it finished: cut off
    /// speech and return to idle so the session accepts input again.
    pub fn abort_turn(&mut self) {
        let was = self.status.current();
        self.speaker.stop();
        self.status.reset();
        if was.is_busy() {
            info!("chat: abandoned turn in {} while {was}", self.session);
        }
    }

    /// Stop speech and leave the conversation.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.speaker.stop();
        self.status.reset();
        self.closed = true;
        info!("chat: closed session {}", self.session);
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.status.current() {
            BotStatus::Idle => Ok(()),
            busy => Err(Error::Busy(busy)),
        }
    }

    /// From `thinking`: wait, pick the reply, speak it, end at idle.
    async fn respond(&mut self, text: &str, heard: Option<String>) -> Result<Turn> {
        tokio::time::sleep(self.reply_delay).await;

        let selection = self.selector.select(text);
        let reply = selection.reply.to_string();
        let category = selection.category;
        self.messages.push(Message::bot(reply.as_str()));

        let (spoken, notice) = self.speak(&reply).await?;
        Ok(Turn {
            heard,
            reply,
            category,
            spoken,
            notice,
        })
    }

    async fn speak(&mut self, text: &str) -> Result<(Spoken, Option<String>)> {
        let output = if self.muted {
            VoiceOutput::None
        } else {
            self.table.voice_output
        };

        let result = self
            .speaker
            .speak(&self.backend, output, text, &mut self.status)
            .await;
        self.status.settle()?;

        match result {
            Ok(spoken) => Ok((spoken, None)),
            Err(Error::Audio(msg)) => {
                warn!("chat: could not speak reply: {msg}");
                Ok((Spoken::Silent, Some(msg)))
            }
            Err(e) => Err(e),
        }
    }
}

impl<B, A: AudioOutput> Drop for ChatSession<B, A> {
    fn drop(&mut self) {
        if !self.closed {
            self.speaker.stop();
        }
    }
}
