//! SSH transport: TCP connect, host key policy, login and PTY channels.
//!
//! Everything above this layer talks to the device through a
//! [`PtyChannel`](crate::channel::PtyChannel) opened from an [`SshTransport`].

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
