use serde::{Deserialize, Serialize};

pub const AUTO_LANGUAGE: &str = "Auto";
pub const MAX_LEVEL: u8 = 100;

/// Languages offered by the header switch, as (language name, tab label).
pub const LANGUAGE_TABS: &[(&str, &str)] = &[
    ("English", "EN"),
    ("Bengali", "BN"),
    ("Hindi", "HI"),
    (AUTO_LANGUAGE, "AUTO"),
];

/// Tone parameters that shape the system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub sarcasm: u8,
    pub edge: u8,
    pub language: String,
    #[serde(rename = "fastReply")]
    pub fast_reply: bool,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            sarcasm: 98,
            edge: 95,
            language: "English".to_string(),
            fast_reply: false,
        }
    }
}

impl PersonaConfig {
    /// Clamp slider values into range and replace a blank language with `Auto`.
    pub fn normalized(mut self) -> Self {
        self.sarcasm = self.sarcasm.min(MAX_LEVEL);
        self.edge = self.edge.min(MAX_LEVEL);
        let trimmed = self.language.trim();
        if trimmed.is_empty() {
            self.language = AUTO_LANGUAGE.to_string();
        } else if trimmed.len() != self.language.len() {
            self.language = trimmed.to_string();
        }
        self
    }

    pub fn is_auto_language(&self) -> bool {
        self.language.eq_ignore_ascii_case(AUTO_LANGUAGE)
    }

    pub fn with_language(&self, language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..self.clone()
        }
        .normalized()
    }

    /// Adjust one slider by a signed step, saturating at 0 and 100.
    pub fn adjusted(&self, field: PersonaField, delta: i16) -> Self {
        let mut next = self.clone();
        let slot = match field {
            PersonaField::Sarcasm => &mut next.sarcasm,
            PersonaField::Edge => &mut next.edge,
        };
        let value = (*slot as i16 + delta).clamp(0, MAX_LEVEL as i16);
        *slot = value as u8;
        next
    }

    /// The next language in the header tab order. Unknown languages restart
    /// the cycle.
    pub fn next_language(&self) -> &'static str {
        let position = LANGUAGE_TABS
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(&self.language));
        match position {
            Some(index) => LANGUAGE_TABS[(index + 1) % LANGUAGE_TABS.len()].0,
            None => LANGUAGE_TABS[0].0,
        }
    }

    /// Build the system instruction sent with every session.
    pub fn system_instruction(&self) -> String {
        let language_directive = if self.is_auto_language() {
            "Respond in the same language as the user.".to_string()
        } else {
            format!("Speak ONLY in {}.", self.language)
        };

        format!(
            "You are VULCAN, the Friendly Roast Master. Your only job is to roast the user as briefly as possible.

DIRECTIVES:
1. BREVITY: One short sentence per reply. One-liners only.
2. NO EXPLANATIONS: Never explain the joke or add context. Deliver the burn and stop.
3. IMPACT: Maximum wit, minimum words. Aim for 5-10 words.
4. PERSONALITY: Arrogant, quick and witty. You are the final word in digital criticism.
5. FRIENDLY ROAST: Sharp but fun. No real malice.
6. LANGUAGE: {language_directive}
7. TONE: Sarcastic ({sarcasm}%), Edgy ({edge}%).

Rule: never exceed 15 words in a reply.",
            sarcasm = self.sarcasm,
            edge = self.edge,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaField {
    Sarcasm,
    Edge,
}

impl PersonaField {
    pub fn label(self) -> &'static str {
        match self {
            PersonaField::Sarcasm => "Sarcasm Level",
            PersonaField::Edge => "Edge Factor",
        }
    }

    pub fn value(self, persona: &PersonaConfig) -> u8 {
        match self {
            PersonaField::Sarcasm => persona.sarcasm,
            PersonaField::Edge => persona.edge,
        }
    }
}
