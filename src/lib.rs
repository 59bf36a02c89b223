pub mod chatbot;
pub mod config;
pub mod server;
pub mod trainer;
