// src/config/mod.rs
//! Configuration system for vault-session
//!
//! Central, lazy-loaded global config with TOML + env overrides.

pub use app::{load, Config, CreateDefaults, Paths};

mod app;
mod defaults;
