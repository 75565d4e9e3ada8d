//! critter CLI — chat server and terminal chat client.
//!
//! ```text
//! critter serve [--port 3000] [--host 127.0.0.1] [--transcripts-dir transcriptions]
//! critter chat panda [--server http://localhost:3000] [--accept-terms] [--mute]
//! critter personas [--server ...]
//! critter reply cat "thanks for listening"
//! critter terms
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use critter_lib::chat::{ChatSession, Turn};
use critter_lib::client::{ApiClient, DEFAULT_SERVER};
use critter_lib::critter_core::persona::{self, Persona};
use critter_lib::critter_core::terms;
use critter_lib::critter_core::text_prep::normalize_input;
use critter_lib::critter_core::types::{
    ServerConfig, SttConfig, TtsConfig, DEFAULT_ELEVENLABS_URL, DEFAULT_OPENAI_URL,
    DEFAULT_STT_MODEL, DEFAULT_TTS_MODEL,
};
use critter_lib::server::{self, ServerState};
use critter_lib::speech::{AudioOutput, Spoken, SystemAudio};
use critter_lib::stt::AudioClip;
use critter_lib::Error;

/// critter — animal therapist chat with voice in and out
#[derive(Parser)]
#[command(name = "critter", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// Listen port
        #[arg(long, env = "CRITTER_PORT", default_value = "3000")]
        port: u16,
        /// Listen host
        #[arg(long, env = "CRITTER_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Directory for per-session transcript files
        #[arg(long, env = "CRITTER_TRANSCRIPTS_DIR", default_value = "transcriptions")]
        transcripts_dir: PathBuf,
        /// Credential for hosted transcription
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        openai_api_key: Option<String>,
        /// Credential for hosted speech synthesis
        #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
        elevenlabs_api_key: Option<String>,
        /// Transcription API base URL
        #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_URL)]
        openai_url: String,
        /// Speech synthesis API base URL
        #[arg(long, env = "ELEVENLABS_BASE_URL", default_value = DEFAULT_ELEVENLABS_URL)]
        elevenlabs_url: String,
        /// Transcription model
        #[arg(long, default_value = DEFAULT_STT_MODEL)]
        stt_model: String,
        /// Speech synthesis model
        #[arg(long, default_value = DEFAULT_TTS_MODEL)]
        tts_model: String,
    },
    /// Chat with a persona in the terminal
    Chat {
        /// Persona slug or name, e.g. "panda"
        persona: String,
        /// Server URL
        #[arg(long, env = "CRITTER_SERVER", default_value = DEFAULT_SERVER)]
        server: String,
        /// Accept the terms of service without prompting
        #[arg(long)]
        accept_terms: bool,
        /// Text only, no spoken replies
        #[arg(long)]
        mute: bool,
        /// Audio player command for hosted voices
        #[arg(long, env = "CRITTER_PLAYER")]
        player: Option<String>,
        /// Local speech synthesizer command
        #[arg(long, env = "CRITTER_SYNTH")]
        synth: Option<String>,
    },
    /// List personas (from a running server if --server is given)
    Personas {
        #[arg(long)]
        server: Option<String>,
    },
    /// Print a persona's canned reply to some text
    Reply {
        persona: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Print the terms of service
    Terms,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "critter=info,critter_lib=info",
        1 => "critter=debug,critter_lib=debug,tower_http=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout belongs to the conversation
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve {
            port,
            host,
            transcripts_dir,
            openai_api_key,
            elevenlabs_api_key,
            openai_url,
            elevenlabs_url,
            stt_model,
            tts_model,
        } => {
            let mut stt = SttConfig::new(openai_api_key);
            stt.base_url = openai_url;
            stt.model = stt_model;

            let mut tts = TtsConfig::new(elevenlabs_api_key);
            tts.base_url = elevenlabs_url;
            tts.model = tts_model;

            let config = ServerConfig {
                transcripts_dir,
                stt,
                tts,
            };
            serve(&host, port, &config).await
        }

        Command::Chat {
            persona,
            server,
            accept_terms,
            mute,
            player,
            synth,
        } => {
            let persona = lookup(&persona)?;
            let audio = SystemAudio::detect(player.as_deref(), synth.as_deref());
            chat(persona, ApiClient::new(server), audio, accept_terms, mute).await
        }

        Command::Personas { server } => list_personas(server).await,

        Command::Reply { persona, text } => {
            let persona = lookup(&persona)?;
            let Some(selector) = persona.selector() else {
                bail!("{} is not available for chat yet", persona.name);
            };
            let joined = text.join(" ");
            let Some(input) = normalize_input(&joined) else {
                bail!("text is required");
            };
            let selection = selector.select(input);
            match selection.category {
                Some(category) => println!("{}  ({category:?})", selection.reply),
                None => println!("{}", selection.reply),
            }
            Ok(())
        }

        Command::Terms => {
            print_terms();
            Ok(())
        }
    }
}

fn lookup(name: &str) -> anyhow::Result<&'static Persona> {
    persona::find(name).ok_or_else(|| Error::UnknownPersona(name.to_string()).into())
}

async fn serve(host: &str, port: u16, config: &ServerConfig) -> anyhow::Result<()> {
    let state = ServerState::from_config(config).context("failed to prepare server state")?;
    let app = server::router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("critter listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;
    Ok(())
}

async fn list_personas(server: Option<String>) -> anyhow::Result<()> {
    if let Some(server) = server {
        let listing = ApiClient::new(server).personas().await?;
        for p in listing {
            let chat = if p.chat_available { "" } else { "  (coming soon)" };
            println!("{} {:<10} {}{chat}", p.emoji, p.name, p.title);
        }
        return Ok(());
    }

    for p in persona::all() {
        let chat = if p.chat.is_some() { "" } else { "  (coming soon)" };
        println!("{} {:<10} {}{chat}", p.emoji, p.name, p.title);
        println!("    {}", p.signature);
    }
    Ok(())
}

fn print_terms() {
    let terms = terms::terms();
    println!("Terms of Service\n");
    for (i, clause) in terms.clauses.iter().enumerate() {
        println!("{}. {clause}", i + 1);
    }
    println!("\n{}", terms.acknowledgement);
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}

/// Run `work` unless Ctrl-C arrives first, in which case it is dropped.
async fn interruptible<T>(work: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        out = work => Some(out),
        _ = tokio::signal::ctrl_c() => None,
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    Ok(interruptible(lines.next_line()).await.transpose()?.flatten())
}

async fn chat<A: AudioOutput>(
    persona: &'static Persona,
    client: ApiClient,
    audio: A,
    accept_terms: bool,
    mute: bool,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !accept_terms {
        print_terms();
        prompt("\nType \"yes\" to agree and continue: ");
        let answer = read_line(&mut lines).await?.unwrap_or_default();
        if !terms::is_acceptance(&answer) {
            println!("You need to accept the terms to chat.");
            return Ok(());
        }
    }

    if let Err(e) = client.health().await {
        warn!("server {} is not reachable: {e}", client.base());
        println!("(server unreachable: messages will not be logged and hosted voices are off)");
    }

    let mut chat = ChatSession::new(persona, client, audio)?;
    chat.set_muted(mute);

    let mut status = chat.subscribe();
    let name = persona.name;
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            if let Some(line) = current.indicator(name) {
                println!("  {line}");
            }
        }
    });

    println!("\n{} {}, {}", persona.emoji, persona.name, persona.title);
    println!("\"{}\"", persona.signature);
    println!("Type a message. /voice <file> sends a recording, /status, /back or /quit leaves.\n");
    for message in chat.messages() {
        println!("{} {}: {}", persona.emoji, persona.name, message.text);
    }

    match interruptible(chat.announce()).await {
        Some(Ok(turn)) => show_notice(&turn),
        Some(Err(e)) => warn!("chat: intro not spoken: {e}"),
        None => {
            chat.abort_turn();
            chat.close();
            println!();
            return Ok(());
        }
    }

    loop {
        prompt("> ");
        let Some(line) = read_line(&mut lines).await? else {
            println!();
            break;
        };
        let input = line.trim();

        let turn = match input {
            "" => continue,
            "/quit" | "/back" => break,
            "/status" => {
                println!("  status: {}", chat.status());
                continue;
            }
            "/help" => {
                println!("  /voice <file>  send a recording\n  /status  show bot status\n  /back, /quit  leave");
                continue;
            }
            _ => match input.strip_prefix("/voice") {
                Some(path) => match load_clip(path.trim()).await {
                    Ok(clip) => interruptible(chat.submit_audio(clip)).await,
                    Err(e) => {
                        println!("  {e:#}");
                        continue;
                    }
                },
                None => interruptible(chat.submit_text(input)).await,
            },
        };

        let Some(result) = turn else {
            chat.abort_turn();
            println!("\n  (interrupted)");
            break;
        };

        match result {
            Ok(turn) => {
                if let Some(heard) = &turn.heard {
                    println!("you (voice): {heard}");
                }
                println!("{} {}: {}", persona.emoji, persona.name, turn.reply);
                show_notice(&turn);
            }
            Err(Error::Busy(status)) => println!("  ({} is {status}, try again in a moment)", persona.name),
            Err(e) => println!("  {e}"),
        }
    }

    chat.close();
    println!("Goodbye from {}.", persona.name);
    Ok(())
}

fn show_notice(turn: &Turn) {
    if let Some(notice) = &turn.notice {
        println!("  (could not speak: {notice})");
    } else if turn.spoken == Spoken::Local {
        info!("chat: spoke with local voice");
    }
}

async fn load_clip(path: &str) -> anyhow::Result<AudioClip> {
    if path.is_empty() {
        bail!("usage: /voice <path to audio file>");
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {path}"))?;
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("recording.webm")
        .to_string();
    let mime = AudioClip::mime_for(&file_name);
    Ok(AudioClip::new(bytes, file_name, mime))
}
