//! Chat front end: a button-driven conversation per user, independent of
//! the chat service, and the Telegram adapter that carries it.

pub mod engine;
pub mod flow;
pub mod telegram;

pub use engine::{Button, Conversation, Keyboard, Reply, UserId};
pub use flow::{Command, Event};
pub use telegram::{BotApi, TelegramBot};
