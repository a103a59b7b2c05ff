pub mod data;
pub mod io;


pub use data::{
    path_display, Config, RetrySettings, DEFAULT_APP_NAME, DEFAULT_BASE_URL, DEFAULT_STREAM_BUFFER,
};
pub use io::ConfigError;
