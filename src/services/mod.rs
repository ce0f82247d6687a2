//! Built-in backend implementations of the service traits.
//!
//! Currently one backend ships with the crate: [`http::HttpBackend`], gated
//! behind the `backend-http` feature (enabled by default). Embeddings with
//! their own transport implement the traits in [`crate::service`] directly.

#[cfg(feature = "backend-http")]
pub mod http;

#[cfg(feature = "backend-http")]
pub use http::HttpBackend;
