//! Discord surface of the bot.
//!
//! - [`rest`]: HTTP calls (command registration, interaction callbacks, follow-ups)
//! - [`gateway`]: websocket session that receives `INTERACTION_CREATE` events
//! - [`interaction`]: typed interaction payloads
//! - [`embed`]: the final success/failure report
//! - [`handler`]: the `/sync` command itself

pub mod embed;
pub mod gateway;
pub mod handler;
pub mod interaction;
pub mod rest;

pub use gateway::Gateway;
pub use handler::{CommandHandler, SyncCommand};
pub use rest::DiscordHttp;
