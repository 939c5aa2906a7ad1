// HTTP transport for remote media URLs

pub mod client;
pub mod range_source;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::{HttpClient, HttpConfig};
pub use range_source::HttpRangeSource;
