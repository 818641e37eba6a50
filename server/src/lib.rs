//! InfraAgent Library
//!
//! Core modules for the InfraAgent deployment orchestrator.

pub mod errors;
pub mod extract;
pub mod github;
pub mod logs;
pub mod models;
pub mod orchestrator;
pub mod platform;
pub mod registry;
pub mod server;
pub mod settings;
pub mod utils;
