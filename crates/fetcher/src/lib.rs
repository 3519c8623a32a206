//! HTTP fetcher - baseline response retrieval over reqwest

mod client;

pub use client::HttpFetcher;
