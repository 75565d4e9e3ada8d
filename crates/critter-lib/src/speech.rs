//! Spoken replies — hosted synthesis with local fallback.
//!
//! ```text
//! speak(text) ─► hosted TTS ─ok─► play mp3 (speaking) ─► idle
//!                    │ err / no credential
//!                    └──────► local synth (speaking) ─► idle
//! ```
//!
//! One attempt per strategy, no retries. Playback and local synthesis run as
//! child processes (`afplay`/`mpv`/`ffplay`, `say`/`espeak-ng`/`espeak`/
//! `spd-say`) so nothing here links against a sound library.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, info, warn};

use critter_core::persona::VoiceOutput;
use critter_core::status::BotStatus;

use crate::error::{Error, Result};
use crate::status::StatusTracker;

const PLAYERS: &[&str] = &["afplay", "mpv", "ffplay"];
const SYNTHS: &[&str] = &["say", "espeak-ng", "espeak", "spd-say"];

/// Hosted text-to-speech. Returns MP3 bytes.
pub trait HostedTts: Send + Sync {
    fn tts(&self, text: &str, voice_id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Somewhere to send sound.
pub trait AudioOutput: Send + Sync {
    /// Play MP3 bytes to completion.
    fn play(&self, audio: &[u8]) -> impl Future<Output = Result<()>> + Send;
    /// Speak `text` with local synthesis, to completion.
    fn say(&self, text: &str) -> impl Future<Output = Result<()>> + Send;
    /// Cut off whatever is currently sounding.
    fn stop(&self);
}

/// Which strategy actually produced sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spoken {
    Silent,
    Hosted,
    Local,
}

/// Drives one utterance through the strategies for a persona's
/// [`VoiceOutput`], reporting `speaking`/`idle` on `status`.
pub struct Speaker<A> {
    audio: A,
}

impl<A: AudioOutput> Speaker<A> {
    pub fn new(audio: A) -> Self {
        Self { audio }
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// Speak `text`. Hosted failures fall back to local synthesis and are
    /// only logged. An error means no strategy could produce sound. The
    /// status is back at idle whenever speech started.
    pub async fn speak<T: HostedTts>(
        &self,
        hosted: &T,
        output: VoiceOutput,
        text: &str,
        status: &mut StatusTracker,
    ) -> Result<Spoken> {
        let voice_id = match output {
            VoiceOutput::None => return Ok(Spoken::Silent),
            VoiceOutput::Local => None,
            VoiceOutput::Hosted { voice_id } => Some(voice_id),
        };

        if let Some(voice_id) = voice_id {
            match hosted.tts(text, voice_id).await {
                Ok(audio) => {
                    status.advance(BotStatus::Speaking)?;
                    let played = self.audio.play(&audio).await;
                    match played {
                        Ok(()) => {
                            status.settle()?;
                            return Ok(Spoken::Hosted);
                        }
                        Err(e) => warn!("speech: playback failed, using local voice: {e}"),
                    }
                }
                Err(e) => info!("speech: hosted voice unavailable, using local voice: {e}"),
            }
        }

        if status.current() != BotStatus::Speaking {
            status.advance(BotStatus::Speaking)?;
        }
        let said = self.audio.say(text).await;
        status.settle()?;
        said.map(|()| Spoken::Local)
    }

    pub fn stop(&self) {
        self.audio.stop();
    }
}

impl<T: AudioOutput> AudioOutput for Arc<T> {
    fn play(&self, audio: &[u8]) -> impl Future<Output = Result<()>> + Send {
        (**self).play(audio)
    }

    fn say(&self, text: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).say(text)
    }

    fn stop(&self) {
        (**self).stop()
    }
}

// ─── System commands ───────────────────────────────────────────────────────

/// A resolved external program plus its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Resolve `name` on `PATH` and attach the arguments it needs to run
    /// headless and block until done.
    pub fn resolve(name: &str) -> Option<Self> {
        let program = find_on_path(name)?;
        let base = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        let args: &[&str] = match base {
            "mpv" => &["--no-video", "--really-quiet"],
            "ffplay" => &["-nodisp", "-autoexit", "-loglevel", "quiet"],
            "spd-say" => &["--wait"],
            _ => &[],
        };
        Some(Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    /// First of `names` that resolves.
    pub fn first_available(names: &[&str]) -> Option<Self> {
        names.iter().find_map(|n| Self::resolve(n))
    }

    fn command(&self, last: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(last)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Explicit paths are taken as given; bare names are searched on `PATH`.
fn find_on_path(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = dir.join(format!("{name}.exe"));
        exe.is_file().then_some(exe)
    })
}

/// [`AudioOutput`] backed by external player and synthesizer commands.
#[derive(Debug, Default)]
pub struct SystemAudio {
    player: Option<ToolCommand>,
    synth: Option<ToolCommand>,
    stop: Notify,
}

impl SystemAudio {
    /// Use `player`/`synth` when given, otherwise the first platform default
    /// found on `PATH`.
    pub fn detect(player: Option<&str>, synth: Option<&str>) -> Self {
        let player = match player {
            Some(name) => ToolCommand::resolve(name),
            None => ToolCommand::first_available(PLAYERS),
        };
        let synth = match synth {
            Some(name) => ToolCommand::resolve(name),
            None => ToolCommand::first_available(SYNTHS),
        };
        info!(
            "audio: player={:?} synth={:?}",
            player.as_ref().map(|c| &c.program),
            synth.as_ref().map(|c| &c.program)
        );
        Self::with_commands(player, synth)
    }

    pub fn with_commands(player: Option<ToolCommand>, synth: Option<ToolCommand>) -> Self {
        Self {
            player,
            synth,
            stop: Notify::new(),
        }
    }

    pub fn player(&self) -> Option<&ToolCommand> {
        self.player.as_ref()
    }

    pub fn synth(&self) -> Option<&ToolCommand> {
        self.synth.as_ref()
    }

    /// Registers interest in [`AudioOutput::stop`]. Must be called before any
    /// work that a stop should cancel.
    fn stop_signal(&self) -> Notified<'_> {
        self.stop.notified()
    }

    /// Wait for `child` to exit, or kill it once `stopped` fires.
    async fn run(&self, mut child: Child, name: &str, stopped: Pin<&mut Notified<'_>>) -> Result<()> {
        if let Some(stderr) = child.stderr.take() {
            let name_log = name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[{name_log}] {line}");
                }
            });
        }

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(Error::Audio(format!("{name} exited with {status}")))
                }
            }
            _ = stopped => {
                debug!("audio: stopping {name}");
                let _ = child.kill().await;
                Ok(())
            }
        }
    }
}

impl AudioOutput for SystemAudio {
    async fn play(&self, audio: &[u8]) -> Result<()> {
        let player = self
            .player
            .as_ref()
            .ok_or_else(|| Error::Audio("no audio player found".into()))?;
        let stopped = self.stop_signal();
        tokio::pin!(stopped);
        stopped.as_mut().enable();

        let file = tempfile::Builder::new()
            .prefix("critter-")
            .suffix(".mp3")
            .tempfile()?;
        tokio::fs::write(file.path(), audio).await?;

        let path = file.path().to_string_lossy();
        let child = player
            .command(&path)
            .spawn()
            .map_err(|e| Error::Audio(format!("failed to spawn {}: {e}", player.program.display())))?;
        self.run(child, "player", stopped).await
    }

    async fn say(&self, text: &str) -> Result<()> {
        let synth = self
            .synth
            .as_ref()
            .ok_or_else(|| Error::Audio("no speech synthesizer found".into()))?;
        let stopped = self.stop_signal();
        tokio::pin!(stopped);
        stopped.as_mut().enable();

        let child = synth
            .command(text)
            .spawn()
            .map_err(|e| Error::Audio(format!("failed to spawn {}: {e}", synth.program.display())))?;
        self.run(child, "synth", stopped).await
    }

    fn stop(&self) {
        self.stop.notify_waiters();
    }
}
