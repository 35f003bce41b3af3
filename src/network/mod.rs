//! HTTP networking module
//!
//! Provides the HTTP client shared by every search provider.

mod client;

pub use client::{HttpClient, ACCEPT_JSON};
