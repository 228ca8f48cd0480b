pub mod agent;
pub mod api;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod documents;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod render;
pub mod session;
pub mod sse;
pub mod transport;
pub mod ui;
pub mod workspace;

#[cfg(test)]
mod test_support;
