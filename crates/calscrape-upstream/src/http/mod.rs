//! HTTP implementation of [`SessionClient`](crate::SessionClient).

mod client;
mod config;

pub use client::HttpSessionClient;
pub use config::HttpClientConfig;
