//! Storefront scraper - headless-browser rendering and store-aware price
//! extraction behind a small HTTP API.

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod stores;

pub use error::{Result, ScrapeError};
