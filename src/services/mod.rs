// src/services/mod.rs
pub mod assistant;
pub mod config;
pub(crate) mod paths;
pub mod prompts;
