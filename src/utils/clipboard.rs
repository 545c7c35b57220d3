use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    NoCommand,
    Failed(String),
}

impl fmt::Display for ClipboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardError::NoCommand => {
                write!(f, "No clipboard command found (install wl-copy, xclip, or xsel)")
            }
            ClipboardError::Failed(program) => write!(f, "Clipboard command `{program}` failed"),
        }
    }
}

impl std::error::Error for ClipboardError {}

type ClipboardCommand = (&'static str, &'static [&'static str]);

#[cfg(target_os = "macos")]
const CLIPBOARD_COMMANDS: &[ClipboardCommand] = &[("pbcopy", &[])];
#[cfg(target_os = "windows")]
const CLIPBOARD_COMMANDS: &[ClipboardCommand] = &[("cmd", &["/C", "clip"])];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const CLIPBOARD_COMMANDS: &[ClipboardCommand] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Copy `text` with the first clipboard command that exists on this system.
/// Blocks until the command exits.
pub fn copy_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    copy_with(CLIPBOARD_COMMANDS, text)
}

fn copy_with(commands: &[ClipboardCommand], text: &str) -> Result<(), ClipboardError> {
    let mut last_failure = None;
    for (program, args) in commands {
        match run_with_stdin(program, args, text) {
            Ok(true) => return Ok(()),
            Ok(false) => last_failure = Some(ClipboardError::Failed(program.to_string())),
            Err(_) => continue,
        }
    }
    Err(last_failure.unwrap_or(ClipboardError::NoCommand))
}

/// `Err` when the program cannot be spawned, otherwise whether it succeeded.
fn run_with_stdin(program: &str, args: &[&str], input: &str) -> std::io::Result<bool> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(input.as_bytes());
    }
    Ok(child.wait()?.success())
}
