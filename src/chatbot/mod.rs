//! Chatbot service - accounts, bots, scripts and platform conversations
//! around the trainer.

pub mod accounts;
pub mod database;
pub mod engine;
pub mod message;
pub mod sessions;
pub mod telegram;
pub mod webhook;


pub use database::Database;
pub use engine::{BotService, Reply, ServiceConfig, ServiceError, TrainingResult};
pub use sessions::AccessToken;
pub use message::{Bot, BotUpdate, IncomingMessage, NewBot, Platform, Role, Script, StoredMessage, User};
pub use telegram::TelegramClient;
