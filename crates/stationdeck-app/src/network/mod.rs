//! Network operations
//!
//! HTTP client shared by the catalog providers.

pub mod client;

pub use client::HttpClient;
