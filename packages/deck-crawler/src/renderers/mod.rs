//! Renderer backends.

mod http;

pub use http::HttpRenderer;
