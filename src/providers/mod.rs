//! Search providers module
//!
//! External ranking providers (Bing, Google) and the internal index, each
//! implemented as a [`Provider`] adapter and run over HTTP by
//! [`HttpProvider`].

pub mod bing;
pub mod google;
mod http;
pub mod internal;
mod loader;
mod registry;
mod traits;

pub use http::HttpProvider;
pub use loader::ProviderLoader;
pub use registry::ProviderSet;
pub use traits::*;
