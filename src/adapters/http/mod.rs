//! HTTP adapters for the read-side API.

mod api_client;

pub use api_client::{HttpApiConfig, HttpGameApi};
