//! Stoat target platform for the relay.
//!
//! Talks to the Stoat REST API for messages and to the Autumn file server for
//! attachment uploads, authenticating every call with the bot token.

pub mod client;

pub use client::{BOT_TOKEN_HEADER, StoatClient};
