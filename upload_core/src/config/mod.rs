pub mod settings;

pub use settings::{AppConfig, ServerConfig, UploadConfig};
