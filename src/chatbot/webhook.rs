//! Platform webhook adapters.
//!
//! Each platform wraps a user's message in its own envelope. These helpers
//! unwrap inbound payloads into an [`IncomingMessage`] and wrap the bot's
//! reply in the shape the platform expects back.

use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;

use crate::chatbot::message::{IncomingMessage, Platform};

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookError {
    UnsupportedPlatform(String),
    InvalidPayload { platform: Platform, reason: String },
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPlatform(name) => write!(f, "unsupported platform '{}'", name),
            Self::InvalidPayload { platform, reason } => {
                write!(f, "invalid {} payload: {}", platform, reason)
            }
        }
    }
}

impl std::error::Error for WebhookError {}

/// What an inbound webhook asks of us.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A user message that needs a reply.
    Message(IncomingMessage),
    /// Platform liveness check (Discord PING).
    Ping,
    /// Delivery receipts and other events without user text.
    Ignored,
}

pub fn parse_platform(name: &str) -> Result<Platform, WebhookError> {
    name.parse()
        .map_err(|_| WebhookError::UnsupportedPlatform(name.to_string()))
}

// WhatsApp: {"messages": [{"from": "...", "text": {"body": "..."}}]}
#[derive(Deserialize)]
struct WhatsAppPayload {
    #[serde(default)]
    messages: Vec<WhatsAppMessage>,
}

#[derive(Deserialize)]
struct WhatsAppMessage {
    from: String,
    text: Option<WhatsAppText>,
}

#[derive(Deserialize)]
struct WhatsAppText {
    body: String,
}

// Telegram: {"message": {"chat": {"id": 1}, "text": "..."}}
#[derive(Deserialize)]
struct TelegramUpdate {
    message: Option<TelegramMessage>,
}

#[derive(Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct TelegramChat {
    id: i64,
}

// Instagram (Messenger platform): {"entry": [{"messaging": [{"sender": {"id": ".."}, "message": {"text": ".."}}]}]}
#[derive(Deserialize)]
struct InstagramPayload {
    #[serde(default)]
    entry: Vec<InstagramEntry>,
}

#[derive(Deserialize)]
struct InstagramEntry {
    #[serde(default)]
    messaging: Vec<InstagramEvent>,
}

#[derive(Deserialize)]
struct InstagramEvent {
    sender: InstagramParty,
    message: Option<InstagramMessage>,
}

#[derive(Deserialize)]
struct InstagramParty {
    id: String,
}

#[derive(Deserialize)]
struct InstagramMessage {
    text: Option<String>,
}

// Discord interactions: type 1 is PING, commands carry text in data.options.
#[derive(Deserialize)]
struct DiscordInteraction {
    #[serde(rename = "type")]
    kind: u8,
    data: Option<DiscordData>,
    member: Option<DiscordMember>,
    user: Option<DiscordUser>,
}

#[derive(Deserialize)]
struct DiscordData {
    #[serde(default)]
    options: Vec<DiscordOption>,
}

#[derive(Deserialize)]
struct DiscordOption {
    value: Value,
}

#[derive(Deserialize)]
struct DiscordMember {
    user: DiscordUser,
}

#[derive(Deserialize)]
struct DiscordUser {
    id: String,
}

const DISCORD_PING: u8 = 1;

/// Unwrap an inbound webhook body.
pub fn parse_inbound(platform: Platform, body: &str) -> Result<Inbound, WebhookError> {
    let invalid = |e: serde_json::Error| WebhookError::InvalidPayload {
        platform,
        reason: e.to_string(),
    };

    let message = |sender_id: String, text: String| {
        Inbound::Message(IncomingMessage { platform, sender_id, text })
    };

    let inbound = match platform {
        Platform::WhatsApp => {
            let payload: WhatsAppPayload = serde_json::from_str(body).map_err(invalid)?;
            match payload.messages.into_iter().next() {
                Some(WhatsAppMessage { from, text: Some(text) }) => message(from, text.body),
                _ => Inbound::Ignored,
            }
        }
        Platform::Telegram => {
            let update: TelegramUpdate = serde_json::from_str(body).map_err(invalid)?;
            match update.message {
                Some(TelegramMessage { chat, text: Some(text) }) => message(chat.id.to_string(), text),
                _ => Inbound::Ignored,
            }
        }
        Platform::Instagram => {
            let payload: InstagramPayload = serde_json::from_str(body).map_err(invalid)?;
            let event = payload
                .entry
                .into_iter()
                .next()
                .and_then(|e| e.messaging.into_iter().next());
            match event {
                Some(InstagramEvent { sender, message: Some(InstagramMessage { text: Some(text) }) }) => {
                    message(sender.id, text)
                }
                _ => Inbound::Ignored,
            }
        }
        Platform::Discord => {
            let interaction: DiscordInteraction = serde_json::from_str(body).map_err(invalid)?;
            if interaction.kind == DISCORD_PING {
                return Ok(Inbound::Ping);
            }
            let sender = interaction
                .member
                .map(|m| m.user)
                .or(interaction.user)
                .map(|u| u.id);
            let text = interaction
                .data
                .and_then(|d| d.options.into_iter().next())
                .and_then(|o| o.value.as_str().map(str::to_string));
            match (sender, text) {
                (Some(sender), Some(text)) => message(sender, text),
                _ => Inbound::Ignored,
            }
        }
    };
    Ok(inbound)
}

/// Wrap a reply for the platform the message came from.
pub fn render_reply(bot_id: i64, incoming: &IncomingMessage, reply: &str) -> Value {
    match incoming.platform {
        Platform::WhatsApp => json!({
            "messages": [{
                "from": bot_id,
                "to": incoming.sender_id,
                "text": { "body": reply }
            }]
        }),
        Platform::Telegram => {
            let chat_id = incoming
                .sender_id
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(incoming.sender_id.clone()));
            json!({
                "method": "sendMessage",
                "chat_id": chat_id,
                "text": reply
            })
        }
        Platform::Instagram => json!({
            "recipient": { "id": incoming.sender_id },
            "message": { "text": reply }
        }),
        Platform::Discord => json!({
            "type": 4,
            "data": { "content": reply }
        }),
    }
}

/// Body answering a platform ping.
pub fn ping_reply() -> Value {
    json!({ "type": DISCORD_PING })
}

/// Body acknowledging an event that needed no reply.
pub fn ignored_reply() -> Value {
    json!({ "status": "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_message(inbound: Inbound) -> IncomingMessage {
        match inbound {
            Inbound::Message(m) => m,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!(parse_platform("whatsapp").unwrap(), Platform::WhatsApp);
        assert_eq!(parse_platform("Telegram").unwrap(), Platform::Telegram);
        assert!(matches!(parse_platform("myspace"), Err(WebhookError::UnsupportedPlatform(_))));
    }

    #[test]
    fn test_whatsapp_round_trip() {
        let body = r#"{"messages": [{"from": "15551234567", "text": {"body": "hi there"}}]}"#;
        let msg = expect_message(parse_inbound(Platform::WhatsApp, body).unwrap());
        assert_eq!(msg.sender_id, "15551234567");
        assert_eq!(msg.text, "hi there");

        let reply = render_reply(3, &msg, "hello");
        assert_eq!(reply["messages"][0]["from"], 3);
        assert_eq!(reply["messages"][0]["to"], "15551234567");
        assert_eq!(reply["messages"][0]["text"]["body"], "hello");
    }

    #[test]
    fn test_whatsapp_status_update_ignored() {
        let body = r#"{"statuses": [{"id": "wamid", "status": "delivered"}]}"#;
        assert_eq!(parse_inbound(Platform::WhatsApp, body).unwrap(), Inbound::Ignored);
    }

    #[test]
    fn test_telegram_numeric_chat_id() {
        let body = r#"{"update_id": 1, "message": {"message_id": 5, "chat": {"id": -100123}, "text": "ping"}}"#;
        let msg = expect_message(parse_inbound(Platform::Telegram, body).unwrap());
        assert_eq!(msg.sender_id, "-100123");

        let reply = render_reply(1, &msg, "pong");
        assert_eq!(reply["method"], "sendMessage");
        assert_eq!(reply["chat_id"], -100123);
        assert_eq!(reply["text"], "pong");
    }

    #[test]
    fn test_telegram_sticker_ignored() {
        let body = r#"{"message": {"chat": {"id": 1}, "sticker": {}}}"#;
        assert_eq!(parse_inbound(Platform::Telegram, body).unwrap(), Inbound::Ignored);
    }

    #[test]
    fn test_instagram_message() {
        let body = r#"{"object": "instagram", "entry": [{"id": "1", "messaging": [
            {"sender": {"id": "igsid"}, "recipient": {"id": "page"}, "message": {"mid": "m", "text": "price?"}}
        ]}]}"#;
        let msg = expect_message(parse_inbound(Platform::Instagram, body).unwrap());
        assert_eq!(msg.sender_id, "igsid");
        assert_eq!(msg.text, "price?");

        let reply = render_reply(1, &msg, "ten dollars");
        assert_eq!(reply["recipient"]["id"], "igsid");
        assert_eq!(reply["message"]["text"], "ten dollars");
    }

    #[test]
    fn test_discord_ping() {
        assert_eq!(parse_inbound(Platform::Discord, r#"{"type": 1}"#).unwrap(), Inbound::Ping);
        assert_eq!(ping_reply(), json!({"type": 1}));
    }

    #[test]
    fn test_discord_command() {
        let body = r#"{"type": 2, "data": {"name": "ask", "options": [{"name": "q", "value": "hours?"}]},
                       "member": {"user": {"id": "8080"}}}"#;
        let msg = expect_message(parse_inbound(Platform::Discord, body).unwrap());
        assert_eq!(msg.sender_id, "8080");
        assert_eq!(msg.text, "hours?");
        assert_eq!(render_reply(1, &msg, "9 to 5"), json!({"type": 4, "data": {"content": "9 to 5"}}));
    }

    #[test]
    fn test_discord_dm_uses_top_level_user() {
        let body = r#"{"type": 2, "data": {"options": [{"value": "hey"}]}, "user": {"id": "77"}}"#;
        let msg = expect_message(parse_inbound(Platform::Discord, body).unwrap());
        assert_eq!(msg.sender_id, "77");
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_inbound(Platform::WhatsApp, "{not json").unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload { platform: Platform::WhatsApp, .. }));
        assert!(err.to_string().contains("whatsapp"));
    }
}
