//! Integration tests for dogfetch

mod cache;
mod crawl;
mod enrich;
