//! Records shared by the store, the service and the platform adapters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::trainer::PersonalityProfile;

/// Account role. Admins can see and manage every bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub(crate) fn from_db(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A managed chatbot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bot {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Free-form descriptor chosen by the owner, e.g. "friendly".
    pub personality: String,
    pub owner_id: i64,
    /// Set by the last successful training run.
    pub personality_profile: Option<PersonalityProfile>,
    pub trained_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBot {
    pub name: String,
    pub description: Option<String>,
    pub personality: Option<String>,
}

/// Partial update; `None` fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub personality: Option<String>,
}

/// A training script assigned to a bot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub id: i64,
    pub bot_id: i64,
    pub content: String,
}

/// One platform user talking to one bot.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: i64,
    pub platform: Platform,
    /// Platform-specific sender id.
    pub user_id: String,
    pub bot_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: i64,
    pub content: String,
    pub is_from_user: bool,
    pub timestamp: String,
}

impl StoredMessage {
    /// One-line rendering for logs and the CLI.
    pub fn format(&self) -> String {
        let who = if self.is_from_user { "user" } else { "bot" };
        format!("[{} {}]: {:?}", self.timestamp, who, self.content)
    }
}

/// Messaging platforms a bot can be reached on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    WhatsApp,
    Telegram,
    Instagram,
    Discord,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::WhatsApp => "whatsapp",
            Platform::Telegram => "telegram",
            Platform::Instagram => "instagram",
            Platform::Discord => "discord",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "whatsapp" => Ok(Platform::WhatsApp),
            "telegram" => Ok(Platform::Telegram),
            "instagram" => Ok(Platform::Instagram),
            "discord" => Ok(Platform::Discord),
            other => Err(format!("unsupported platform '{other}'")),
        }
    }
}

/// A message received from a platform, already stripped of its envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub platform: Platform,
    pub sender_id: String,
    pub text: String,
}
