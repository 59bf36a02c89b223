//! Telegram front end using teloxide long polling.
//!
//! Every text message the Telegram bot receives is answered by one managed
//! bot, the same way a Telegram webhook delivery would be.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{MessageId, ReplyParameters};
use tracing::{info, warn};

use crate::chatbot::engine::{BotService, Reply};
use crate::chatbot::message::{IncomingMessage, Platform};

/// Telegram API client bound to one managed bot.
pub struct TelegramClient {
    bot: Bot,
    service: Arc<BotService>,
    bot_id: i64,
}

impl TelegramClient {
    pub fn new(bot: Bot, service: Arc<BotService>, bot_id: i64) -> Self {
        Self { bot, service, bot_id }
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Poll Telegram until Ctrl-C.
    pub async fn run(self) {
        match self.bot.get_me().await {
            Ok(me) => info!("Telegram @{} answering for bot {}", me.username(), self.bot_id),
            Err(e) => warn!("Failed to get Telegram bot info: {e}"),
        }

        let bot = self.bot.clone();
        let state = Arc::new(self);
        let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![state])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

async fn handle_message(msg: Message, client: Arc<TelegramClient>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return Ok(());
    }

    let incoming = to_incoming(msg.chat.id.0, text);
    match answer(client.service.clone(), client.bot_id, incoming).await {
        Ok(reply) => {
            client
                .send_message(msg.chat.id.0, &reply.text, Some(msg.id.0 as i64))
                .await
                .ok();
        }
        Err(e) => warn!("Failed to answer Telegram chat {}: {}", msg.chat.id, e),
    }

    Ok(())
}

/// Run the blocking SQLite/CPU work of answering off the async runtime.
pub async fn answer(service: Arc<BotService>, bot_id: i64, incoming: IncomingMessage) -> Result<Reply, String> {
    tokio::task::spawn_blocking(move || service.handle_incoming(bot_id, &incoming))
        .await
        .map_err(|e| format!("reply task failed: {e}"))?
        .map_err(|e| e.to_string())
}

/// Build the platform-neutral message for a Telegram chat.
pub fn to_incoming(chat_id: i64, text: &str) -> IncomingMessage {
    IncomingMessage {
        platform: Platform::Telegram,
        sender_id: chat_id.to_string(),
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_incoming_uses_chat_id() {
        let msg = to_incoming(-100123, "hello");
        assert_eq!(msg.platform, Platform::Telegram);
        assert_eq!(msg.sender_id, "-100123");
        assert_eq!(msg.text, "hello");
    }

    #[tokio::test]
    async fn test_answer_off_runtime() {
        use crate::chatbot::database::Database;
        use crate::chatbot::engine::ServiceConfig;
        use crate::chatbot::message::{NewBot, Role};

        let service = Arc::new(BotService::new(ServiceConfig::default(), Arc::new(Database::in_memory().unwrap())));
        let owner = service.register_user("owner", "owner@example.com", "password123", Role::User).unwrap();
        let bot = service.create_bot(&owner, NewBot { name: "tg".into(), ..Default::default() }).unwrap();
        service.add_script(&owner, bot.id, "Our opening hours are nine to five").unwrap();

        let reply = answer(service.clone(), bot.id, to_incoming(42, "opening hours?")).await.unwrap();
        assert_eq!(reply.text, "Our opening hours are nine to five");

        let err = answer(service, bot.id + 1, to_incoming(42, "hi")).await.unwrap_err();
        assert!(err.contains("not found"));
    }
}
