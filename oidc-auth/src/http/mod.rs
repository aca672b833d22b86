//! HTTP client building with middleware.

mod client;
mod retry;

pub use client::{HttpClientConfig, ProviderClientBuilder, RetryingClient};
pub use retry::BackoffPolicy;
