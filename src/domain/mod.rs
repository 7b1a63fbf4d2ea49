//! Domain layer: pure models, ports, and the failure taxonomy.

pub mod error;
pub mod models;
pub mod ports;
