pub mod api;
pub mod badge;
pub mod browser;
pub mod cli;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod error;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;
