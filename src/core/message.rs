use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Model,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::System => "system",
        }
    }

    /// Role label understood by the remote API. Only user turns keep their
    /// role; everything else is replayed as model output.
    pub fn to_api_role(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model | Role::System => "model",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_model(self) -> bool {
        self == Role::Model
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "model" => Ok(Role::Model),
            "system" => Ok(Role::System),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// Opaque message identifier.
///
/// Fresh ids carry 128 bits from the operating system's random source, so two
/// messages never share an id in practice. Ids loaded from storage are kept
/// verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        if getrandom::fill(&mut bytes).is_err() {
            // No OS entropy available; fall back to the clock so ids stay distinct.
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u128;
            bytes = nanos.to_le_bytes();
        }
        let mut id = String::with_capacity(32);
        for byte in bytes {
            id.push_str(&format!("{byte:02x}"));
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            text: text.into(),
            timestamp: now_millis(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_model(&self) -> bool {
        self.role.is_model()
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn roles_serialize_as_lowercase_strings() {
        let message = Message {
            id: MessageId::from("abc"),
            role: Role::Model,
            text: "Nice try.".to_string(),
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&message).expect("serialize");
        assert_eq!(
            json,
            r#"{"id":"abc","role":"model","text":"Nice try.","timestamp":1700000000000}"#
        );

        let parsed: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, message);
    }

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(Role::try_from("assistant").is_err());
        let json = r#"{"id":"x","role":"robot","text":"","timestamp":0}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }

    #[test]
    fn system_and_model_map_to_model_api_role() {
        assert_eq!(Role::User.to_api_role(), "user");
        assert_eq!(Role::Model.to_api_role(), "model");
        assert_eq!(Role::System.to_api_role(), "model");
    }

    #[test]
    fn generated_ids_are_hex_and_distinct() {
        let ids: HashSet<String> = (0..256)
            .map(|_| MessageId::generate().as_str().to_string())
            .collect();
        assert_eq!(ids.len(), 256);
        for id in &ids {
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn new_messages_get_a_timestamp() {
        let before = now_millis();
        let message = Message::user("hi");
        assert!(message.timestamp >= before);
        assert!(message.is_user());
    }
}
