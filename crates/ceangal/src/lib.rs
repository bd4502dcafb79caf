//! Ceangal
//!
//! Google Workspace tools for an LLM agent: mail, documents, spreadsheets,
//! Drive search, local Excel files and web search, behind one OAuth
//! credential lifecycle.

pub mod auth;
pub mod common;
pub mod config;
pub mod google;
pub mod session;
pub mod tools;

pub use config::Config;
pub use session::Session;
pub use tools::{ErrorKind, ToolOutcome, ToolPayload, ToolRegistry, ToolResult};
