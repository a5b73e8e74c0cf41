//! Channel layer: the interactive shell, prompt matching and ANSI stripping.

mod buffer;
mod pty;
mod transcript;

pub use buffer::{PatternBuffer, last_line};
pub use pty::{DEFAULT_SEARCH_DEPTH, PtyChannel};
pub use transcript::SessionTranscript;
