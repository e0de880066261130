pub mod backend;
pub mod client;
pub mod error;
pub mod memory;

pub use backend::ChatBackend;
pub use client::{ClientConfig, RagClient, DEFAULT_BASE_URL};
pub use error::{ApiError, Result};
pub use memory::{BackendCall, InMemoryBackend};

pub use ragchat_types as types;
