//! Ports: trait boundaries to external collaborators.

pub mod generation;
pub mod publisher;

pub use generation::{CompletionRequest, GenerationError, GenerationService, ResponseFormat};
pub use publisher::{PublishError, PublishReceipt, Publisher};
