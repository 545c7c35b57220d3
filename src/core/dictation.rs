//! Optional speech-to-text input.
//!
//! Dictation is a capability: when no recognizer is configured the
//! application uses [`NoDictation`] and hides the control. The bundled
//! recognizer runs an external command and treats every line it prints as
//! one transcript.

use std::error::Error as StdError;
use std::fmt;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationEvent {
    Transcript(String),
    Ended,
}

#[derive(Debug)]
pub enum DictationError {
    Unavailable,
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

impl fmt::Display for DictationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictationError::Unavailable => write!(f, "Dictation is not configured"),
            DictationError::Spawn { program, source } => {
                write!(f, "Failed to start dictation command '{program}': {source}")
            }
        }
    }
}

impl StdError for DictationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DictationError::Spawn { source, .. } => Some(source),
            DictationError::Unavailable => None,
        }
    }
}

pub trait Dictation: Send {
    fn is_available(&self) -> bool;
    fn is_listening(&self) -> bool;
    /// Begin listening. Transcripts and the final `Ended` go to `events`.
    fn start(&mut self, events: mpsc::UnboundedSender<DictationEvent>)
        -> Result<(), DictationError>;
    fn stop(&mut self);
}

/// Placeholder used when no recognizer is configured.
pub struct NoDictation;

impl Dictation for NoDictation {
    fn is_available(&self) -> bool {
        false
    }

    fn is_listening(&self) -> bool {
        false
    }

    fn start(
        &mut self,
        _events: mpsc::UnboundedSender<DictationEvent>,
    ) -> Result<(), DictationError> {
        Err(DictationError::Unavailable)
    }

    fn stop(&mut self) {}
}

pub struct CommandDictation {
    program: String,
    args: Vec<String>,
    listening: Arc<AtomicBool>,
    cancel_token: Option<CancellationToken>,
}

impl CommandDictation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            listening: Arc::new(AtomicBool::new(false)),
            cancel_token: None,
        }
    }
}

impl Dictation for CommandDictation {
    fn is_available(&self) -> bool {
        true
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    fn start(
        &mut self,
        events: mpsc::UnboundedSender<DictationEvent>,
    ) -> Result<(), DictationError> {
        if self.is_listening() {
            return Ok(());
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DictationError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.start_kill();
            return Err(DictationError::Spawn {
                program: self.program.clone(),
                source: std::io::Error::other("stdout not captured"),
            });
        };

        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        self.listening.store(true, Ordering::SeqCst);
        let listening = Arc::clone(&self.listening);
        info!(program = %self.program, "dictation started");

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let transcript = line.trim();
                            if !transcript.is_empty() {
                                let _ = events.send(DictationEvent::Transcript(transcript.to_string()));
                            }
                        }
                        Ok(None) => break,
                        Err(err) => {
                            warn!(error = %err, "dictation output unreadable");
                            break;
                        }
                    },
                    _ = token.cancelled() => break,
                }
            }

            if let Err(err) = child.kill().await {
                debug!(error = %err, "dictation command already exited");
            }
            listening.store(false, Ordering::SeqCst);
            let _ = events.send(DictationEvent::Ended);
            debug!("dictation ended");
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

/// Pick the recognizer described by a configured command line.
pub fn from_command(command: &[String]) -> Box<dyn Dictation> {
    match command.split_first() {
        Some((program, args)) if !program.trim().is_empty() => {
            Box::new(CommandDictation::new(program.clone(), args.to_vec()))
        }
        _ => Box::new(NoDictation),
    }
}

/// Append a transcript to the composer text, separated by a space when the
/// existing text has visible content.
pub fn append_transcript(buffer: &str, transcript: &str) -> String {
    let separator = if buffer.trim().is_empty() { "" } else { " " };
    format!("{buffer}{separator}{transcript}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn append_rule_matches_composer_behaviour() {
        assert_eq!(append_transcript("", "hello"), "hello");
        assert_eq!(append_transcript("roast", "me"), "roast me");
        assert_eq!(append_transcript("   ", "me"), "   me");
        assert_eq!(append_transcript("hi ", "there"), "hi  there");
    }

    #[test]
    fn empty_command_means_no_dictation() {
        assert!(!from_command(&[]).is_available());
        assert!(!from_command(&["  ".to_string()]).is_available());
        assert!(from_command(&["whisper".to_string()]).is_available());
    }

    #[test]
    fn no_dictation_refuses_to_start() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut dictation = NoDictation;
        assert!(matches!(
            dictation.start(tx),
            Err(DictationError::Unavailable)
        ));
        assert!(!dictation.is_listening());
    }

    #[tokio::test]
    async fn missing_program_reports_spawn_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut dictation = CommandDictation::new("vulcan-no-such-recognizer", vec![]);
        let err = dictation.start(tx).expect_err("spawn should fail");
        assert!(err.to_string().contains("vulcan-no-such-recognizer"));
        assert!(!dictation.is_listening());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_lines_become_transcripts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dictation = CommandDictation::new(
            "sh",
            vec!["-c".to_string(), "echo 'roast me'; echo; echo again".to_string()],
        );
        dictation.start(tx).expect("start");

        let mut events = Vec::new();
        while let Some(event) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("dictation timed out")
        {
            let ended = event == DictationEvent::Ended;
            events.push(event);
            if ended {
                break;
            }
        }

        assert_eq!(
            events,
            vec![
                DictationEvent::Transcript("roast me".to_string()),
                DictationEvent::Transcript("again".to_string()),
                DictationEvent::Ended,
            ]
        );
        assert!(!dictation.is_listening());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_ends_a_running_command() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dictation =
            CommandDictation::new("sh", vec!["-c".to_string(), "sleep 30".to_string()]);
        dictation.start(tx).expect("start");
        assert!(dictation.is_listening());

        dictation.stop();
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("dictation did not stop");
        assert_eq!(event, Some(DictationEvent::Ended));
        assert!(!dictation.is_listening());
    }
}
