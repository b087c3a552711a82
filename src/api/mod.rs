pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::{Backend, Credential};
pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use types::{StartApplicationRequest, StatusResponse, WireStatus};
