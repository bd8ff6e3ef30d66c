pub mod client;
pub mod protocol;

// Re-export the main types from client
pub use client::{ConnectionConfig, SiglentClient, SiglentClientBuilder, SCPI_PORT};
