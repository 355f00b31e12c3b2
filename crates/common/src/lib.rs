pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, ConnectionSettings, ModelSettings};
pub use error::ChunkflowError;
pub type Result<T> = std::result::Result<T, ChunkflowError>;
