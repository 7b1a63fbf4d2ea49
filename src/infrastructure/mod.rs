//! Infrastructure layer: configuration, HTTP clients, artifact storage.

pub mod artifacts;
pub mod config;
pub mod generation;
pub mod publisher;

pub use artifacts::{ArtifactError, ArtifactStore};
pub use config::{ConfigError, ConfigLoader};
pub use generation::OpenAiClient;
pub use publisher::HttpPublisher;
