//! Page fetching.

pub mod http;

pub use http::HttpFetcher;
