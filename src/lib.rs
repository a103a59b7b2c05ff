//! routechat is a streaming chat-completion client for OpenRouter-style APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the client: request building, SSE parsing, retry policy,
//!   the cancellable event stream, configuration and credential storage.
//! - [`api`] defines the wire payloads for the chat-completions and models
//!   endpoints.
//! - [`cli`] is a thin command-line consumer that exercises the client and
//!   renders errors for people.
//! - [`logging`] wires `tracing` output to stderr.
//!
//! The binary (`src/main.rs`) routes straight into [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod utils;
