//! Front ends for netpilot sessions: the HTTP API with its form page, and a
//! Telegram bot, sharing one session manager and output interpreter.

pub mod chat;
pub mod config;
pub mod interpret;
pub mod web;

#[cfg(test)]
mod testing;
