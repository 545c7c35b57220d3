//! `set`, `show` and `history` subcommands.

use std::fmt;

use chrono::{Local, TimeZone};

use crate::core::config::{path_display, Config};
use crate::core::markup::{plain_text, render_inline};
use crate::core::persona::{PersonaConfig, PersonaField, LANGUAGE_TABS, MAX_LEVEL};
use crate::core::storage::{Storage, StorageError};
use crate::ui::renderer::{MODEL_LABEL, USER_LABEL};
use crate::ui::theme::ThemeKind;

pub const SETTING_KEYS: [&str; 7] = [
    "sarcasm",
    "edge",
    "language",
    "fast-reply",
    "theme",
    "model",
    "suggest-after-cancel",
];

#[derive(Debug)]
pub enum SetError {
    UnknownKey(String),
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    Storage(StorageError),
}

impl fmt::Display for SetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetError::UnknownKey(key) => write!(
                f,
                "Unknown setting '{key}'. Known settings: {}",
                SETTING_KEYS.join(", ")
            ),
            SetError::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "Invalid value '{value}' for {key}: expected {expected}"),
            SetError::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for SetError {
    fn from(err: StorageError) -> Self {
        SetError::Storage(err)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Applied {
    pub message: String,
    /// `config.toml` needs saving.
    pub config_changed: bool,
}

impl Applied {
    fn stored(message: String) -> Self {
        Self {
            message,
            config_changed: false,
        }
    }

    fn configured(message: String) -> Self {
        Self {
            message,
            config_changed: true,
        }
    }
}

/// Apply `key = value` to the persona/theme in `storage` or to `config`.
pub fn apply_setting(
    key: &str,
    value: &str,
    config: &mut Config,
    storage: &Storage,
) -> Result<Applied, SetError> {
    let value = value.trim();
    let invalid = |expected: &'static str| SetError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    };

    match key {
        "sarcasm" | "edge" => {
            let level = value
                .trim_end_matches('%')
                .parse::<u8>()
                .ok()
                .filter(|level| *level <= MAX_LEVEL)
                .ok_or_else(|| invalid("a number from 0 to 100"))?;
            let mut persona = storage.load_persona();
            let field = if key == "sarcasm" {
                persona.sarcasm = level;
                PersonaField::Sarcasm
            } else {
                persona.edge = level;
                PersonaField::Edge
            };
            storage.save_persona(&persona)?;
            Ok(Applied::stored(format!("{} set to {level}%", field.label())))
        }
        "language" => {
            let language = resolve_language(value).ok_or_else(|| invalid("a language name"))?;
            let persona = storage.load_persona().with_language(language.clone());
            storage.save_persona(&persona)?;
            Ok(Applied::stored(format!("Language set to {language}")))
        }
        "fast-reply" => {
            let enabled = parse_flag(value).ok_or_else(|| invalid("on or off"))?;
            let mut persona = storage.load_persona();
            persona.fast_reply = enabled;
            storage.save_persona(&persona)?;
            Ok(Applied::stored(format!("Fast reply {}", on_off(enabled))))
        }
        "theme" => {
            let theme = ThemeKind::parse(value).ok_or_else(|| invalid("neon or obsidian"))?;
            storage.save_theme(theme)?;
            Ok(Applied::stored(format!("Theme set to {}", theme.as_str())))
        }
        "model" => {
            if value.is_empty() {
                return Err(invalid("a model id"));
            }
            config.model = Some(value.to_string());
            Ok(Applied::configured(format!("Model set to {value}")))
        }
        "suggest-after-cancel" => {
            let enabled = parse_flag(value).ok_or_else(|| invalid("on or off"))?;
            config.suggest_after_cancel = Some(enabled);
            Ok(Applied::configured(format!(
                "Suggestions after cancel {}",
                on_off(enabled)
            )))
        }
        _ => Err(SetError::UnknownKey(key.to_string())),
    }
}

/// Tab labels ("BN") and names ("bengali") map to the canonical name; any
/// other non-empty value is taken as a language name verbatim.
fn resolve_language(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    LANGUAGE_TABS
        .iter()
        .find(|(name, label)| name.eq_ignore_ascii_case(value) || label.eq_ignore_ascii_case(value))
        .map(|(name, _)| name.to_string())
        .or_else(|| Some(value.to_string()))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

pub fn summary_lines(config: &Config, storage: &Storage, ephemeral: bool) -> Vec<String> {
    let persona: PersonaConfig = storage.load_persona();
    let config_path = Config::get_config_path()
        .map(path_display)
        .unwrap_or_else(|err| err.to_string());
    let data_path = if ephemeral {
        "in-memory (--ephemeral)".to_string()
    } else {
        config
            .resolve_data_dir()
            .map(path_display)
            .unwrap_or_else(|err| err.to_string())
    };

    vec![
        format!("Sarcasm level:  {}%", persona.sarcasm),
        format!("Edge factor:    {}%", persona.edge),
        format!("Language:       {}", persona.language),
        format!("Fast reply:     {}", on_off(persona.fast_reply)),
        format!("Theme:          {}", storage.load_theme().as_str()),
        format!("Messages:       {}", storage.load_history().len()),
        format!("Model:          {}", config.model()),
        format!("Config file:    {config_path}"),
        format!("Data directory: {data_path}"),
    ]
}

pub fn print_summary(config: &Config, storage: &Storage, ephemeral: bool) {
    for line in summary_lines(config, storage, ephemeral) {
        println!("{line}");
    }
}

pub fn history_lines(storage: &Storage) -> Vec<String> {
    let mut lines = Vec::new();
    for message in storage.load_history() {
        let label = if message.is_user() {
            USER_LABEL
        } else {
            MODEL_LABEL
        };
        let time = Local
            .timestamp_millis_opt(message.timestamp)
            .single()
            .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        lines.push(format!("[{time}] {label}"));
        lines.push(plain_text(&render_inline(&message.text)));
        lines.push(String::new());
    }
    lines
}

pub fn print_history(storage: &Storage) {
    let lines = history_lines(storage);
    if lines.is_empty() {
        println!("No messages yet.");
        return;
    }
    for line in lines {
        println!("{line}");
    }
}
