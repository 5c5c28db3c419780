//! Line-oriented console front-end for a summarization session.
//!
//! Plain lines are submitted for summarization; lines starting with `/`
//! are commands (`/prompt`, `/paste`, `/query`, `/reset`, `/resume`, `/key`,
//! `/help`, `/quit`). A leading `//` submits the line with one `/` removed.
//! `/paste` collects a multi-line transcript until a line holding only `.`.

use chrono::Local;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::gateway::GatewayError;
use crate::session::{Dispatch, Exchange, ExchangeKind, Rejection, SessionKey, SessionTracker};

const HELP: &str = "\
Type a transcript and press Enter to request a summary.
  /paste          enter a multi-line transcript, finished by a line with only \".\"
  //text          submit a line that starts with \"/\"
  /prompt <text>  use a custom instruction (/prompt alone restores the default)
  /query          show the transcript and summary stored for this session
  /reset          start a new session
  /resume <key>   start over on an existing session key
  /key            show the current session key
  /help           show this message
  /quit           exit";

/// Errors produced by the console front-end.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Reading input or writing output failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The gateway could not be created.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Line that ends a `/paste` block.
const PASTE_END: &str = ".";

/// A parsed input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Submit the text for summarization.
    Submit(String),
    /// Set or clear the custom instruction.
    SetPrompt(Option<String>),
    /// Start collecting a multi-line transcript.
    Paste,
    /// Look up the stored result.
    Query,
    /// Start a new session.
    Reset,
    /// Start over on an existing key.
    Resume(SessionKey),
    /// Print the current key.
    ShowKey,
    /// Print usage.
    Help,
    /// Leave the console.
    Quit,
    /// Unrecognized or malformed command.
    Unknown(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Self::Submit(line.to_string()));
        };
        if rest.starts_with('/') {
            return Some(Self::Submit(rest.to_string()));
        }

        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, arg)| (name, arg.trim()));

        let command = match name {
            "prompt" if arg.is_empty() => Self::SetPrompt(None),
            "prompt" => Self::SetPrompt(Some(arg.to_string())),
            "paste" => Self::Paste,
            "query" => Self::Query,
            "reset" | "clear" => Self::Reset,
            "resume" => SessionKey::from_string(arg)
                .map_or_else(|| Self::Unknown("/resume needs a key".to_string()), Self::Resume),
            "key" => Self::ShowKey,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(format!("unknown command /{other}")),
        };
        Some(command)
    }
}

/// Whether the console should keep reading input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// Stop.
    Quit,
}

/// Console state: the tracker, what has already been printed and any
/// transcript being pasted.
pub struct Console {
    tracker: SessionTracker,
    instruction: Option<String>,
    printed: usize,
    pasted: Option<Vec<String>>,
}

impl Console {
    /// Wrap a tracker.
    #[must_use]
    pub const fn new(tracker: SessionTracker) -> Self {
        Self {
            tracker,
            instruction: None,
            printed: 0,
            pasted: None,
        }
    }

    /// Whether a `/paste` block is open.
    #[must_use]
    pub const fn is_pasting(&self) -> bool {
        self.pasted.is_some()
    }

    /// Feed one raw input line.
    ///
    /// Outside a `/paste` block the line is parsed as a command. Inside one,
    /// lines are collected verbatim until the terminating `.`, which yields a
    /// single `Command::Submit` joining them with newlines.
    pub fn accept(&mut self, line: &str) -> Option<Command> {
        let Some(buffer) = self.pasted.as_mut() else {
            return Command::parse(line);
        };
        if line.trim() != PASTE_END {
            buffer.push(line.to_string());
            return None;
        }
        self.finish_paste()
    }

    /// Close an open `/paste` block, yielding its text if anything was entered.
    pub fn finish_paste(&mut self) -> Option<Command> {
        let text = self.pasted.take()?.join("\n");
        (!text.trim().is_empty()).then_some(Command::Submit(text))
    }

    /// The underlying tracker.
    #[must_use]
    pub const fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Run one command and return the lines to print.
    pub async fn handle(&mut self, command: Command) -> (Flow, Vec<String>) {
        let mut lines = Vec::new();
        match command {
            Command::Submit(text) => {
                let outcome = self.tracker.submit(&text, self.instruction.as_deref()).await;
                lines.extend(self.drain());
                lines.extend(notice(outcome));
            }
            Command::SetPrompt(prompt) => {
                lines.push(if prompt.is_some() {
                    "custom instruction set".to_string()
                } else {
                    "default instruction restored".to_string()
                });
                self.instruction = prompt;
            }
            Command::Paste => {
                self.pasted = Some(Vec::new());
                lines.push(format!("paste the transcript, then a line with only \"{PASTE_END}\""));
            }
            Command::Query => {
                let outcome = self.tracker.query().await;
                lines.extend(self.drain());
                lines.extend(notice(outcome));
            }
            Command::Reset => {
                self.tracker.reset();
                self.printed = 0;
                lines.push("session cleared".to_string());
            }
            Command::Resume(key) => {
                lines.push(format!("resumed session {key}"));
                self.tracker.resume(key);
                self.printed = 0;
            }
            Command::ShowKey => lines.push(
                self.tracker
                    .session_key()
                    .map_or_else(|| "no session yet".to_string(), |key| format!("callkey: {key}")),
            ),
            Command::Help => lines.push(HELP.to_string()),
            Command::Quit => return (Flow::Quit, lines),
            Command::Unknown(reason) => lines.push(format!("{reason} (try /help)")),
        }
        (Flow::Continue, lines)
    }

    /// Render entries appended since the last call.
    fn drain(&mut self) -> Vec<String> {
        let fresh = self.tracker.exchanges_since(self.printed);
        self.printed += fresh.len();
        fresh.iter().map(render).collect()
    }
}

/// Render a transcript entry as `[HH:MM:SS] label: body`.
#[must_use]
pub fn render(exchange: &Exchange) -> String {
    let label = match exchange.kind {
        ExchangeKind::UserInput => "you",
        ExchangeKind::Summary => "summary",
        ExchangeKind::QueryResult => "stored",
        ExchangeKind::Error => "error",
    };
    let time = exchange.occurred_at.with_timezone(&Local).format("%H:%M:%S");
    format!("[{time}] {label}: {}", exchange.body)
}

fn notice(outcome: Dispatch) -> Option<String> {
    match outcome {
        Dispatch::Rejected(Rejection::Busy) => Some("busy: a request is still running".to_string()),
        Dispatch::Rejected(Rejection::NoSession) => {
            Some("no session yet: submit a transcript first".to_string())
        }
        Dispatch::Discarded => Some("response dropped: the session was reset".to_string()),
        Dispatch::Completed(_) | Dispatch::Rejected(Rejection::EmptyInput) => None,
    }
}

/// Read commands from `input` until EOF or `/quit`, writing output to `output`.
///
/// # Errors
/// Returns an error if reading or writing fails.
pub async fn run_console<R, W>(
    console: &mut Console,
    mut input: R,
    output: &mut W,
) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(output, "summary client ready (/help for commands)").await?;
    let mut raw = Vec::new();
    loop {
        raw.clear();
        let command = if input.read_until(b'\n', &mut raw).await? == 0 {
            match console.finish_paste() {
                Some(command) => command,
                None => break,
            }
        } else {
            match console.accept(&decode_line(&raw)) {
                Some(command) => command,
                None => continue,
            }
        };
        if matches!(command, Command::Submit(_) | Command::Query) {
            write_line(output, "summarizing...").await?;
        }
        let (flow, rendered) = console.handle(command).await;
        for text in rendered {
            write_line(output, &text).await?;
        }
        if flow == Flow::Quit {
            break;
        }
    }
    output.flush().await?;
    Ok(())
}

/// Decode one input line, replacing invalid UTF-8 instead of failing.
fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if matches!(text, std::borrow::Cow::Owned(_)) {
        warn!("Input line was not valid UTF-8; invalid bytes replaced");
    }
    text.trim_end_matches(['\n', '\r']).to_string()
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
