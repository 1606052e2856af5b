//! exador-store: backend integrations.
//!
//! Implements the `QuizStore` and `IdentityProvider` traits for the hosted
//! REST backend and for an in-memory store, and loads the configuration that
//! selects between them.

pub mod config;
pub mod memory;
pub mod rest;

pub use config::{create_backend, load_config, BackendConfig, ExadorConfig};
pub use memory::InMemoryStore;
pub use rest::RestStore;
