//! Generation service client: HTTP transport, rate limiting.

pub mod client;
pub mod rate_limiter;

pub use client::OpenAiClient;
pub use rate_limiter::TokenBucketRateLimiter;
