//! Remote origin access.

mod fetcher;
mod request;

pub use fetcher::{Fetcher, HttpFetcher, DEFAULT_TIMEOUT};
pub use request::{directory_url, join_path, RequestUrl};
