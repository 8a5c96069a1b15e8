//! HTTP layer: the shared client wrapper and the provider gateway.

mod client;
mod gateway;

pub use client::{HttpClient, HttpClientBuilder};
pub use gateway::EtimsGateway;
