use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration stored in `config.toml`.
///
/// Every field is optional; accessors in `defaults.rs` supply the built-in
/// values so a missing file and an empty file behave the same.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Model id passed to the Gemini API (e.g., "gemini-3-flash-preview")
    pub model: Option<String>,
    /// API root, without the trailing `/models/...` segment
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    /// Thinking budget sent when fast replies are off. Fast replies always send 0.
    pub thinking_budget: Option<u32>,
    /// Fetch follow-up suggestions even when the user stopped the stream
    pub suggest_after_cancel: Option<bool>,
    /// Upper bound for the suggestions request, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Abort a reply stream that stays silent for this many seconds
    pub stream_idle_timeout_secs: Option<u64>,
    /// External speech-to-text command; each stdout line is one transcript
    #[serde(default)]
    pub dictation_command: Vec<String>,
    /// Directory for the history, persona and theme blobs
    pub data_dir: Option<PathBuf>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
