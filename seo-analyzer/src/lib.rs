// Library root: re-exports all modules so integration tests and the binary
// can access the crate's public API.

pub mod app;
pub mod config;
pub mod flows;
pub mod llm;
pub mod protocol;
pub mod seo;
pub mod tui;
pub mod ws_server;
