#![doc = "deploy-bot-core: the sync pipeline behind deploy-bot."]

//! Fetches the head of a GitHub branch, extracts its data files and pushes
//! them into a Roblox place with `lune` and `rbxcloud`.
//!
//! Nothing in this crate knows about Discord: the chat surface lives in the
//! `deploy-bot` crate and plugs in through [`contract::ProgressReporter`].
//!
//! # Usage
//! Build a [`config::SyncConfig`], construct a [`github::GitHubClient`] and a
//! [`roblox::RobloxClient`], then call [`synchronise::synchronise`].

pub mod auth;
pub mod config;
pub mod contract;
pub mod error;
pub mod extract;
pub mod github;
pub mod process;
pub mod roblox;
pub mod synchronise;
