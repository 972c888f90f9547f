pub mod check_env;
pub mod cli;
pub mod discord;
pub mod load_config;
pub mod logging;

pub use cli::{run, Cli, Commands};
