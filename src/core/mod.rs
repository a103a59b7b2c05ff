pub mod chat_stream;
pub mod client;
pub mod config;
pub mod error;
pub mod keyring;
pub mod line_reader;
pub mod message;
pub mod request;
pub mod retry;
pub mod stream_event;
pub mod transport;
