//! HTTP request handlers for the web server.

mod api;
mod extract;
mod scrape;
mod types;

pub use api::{health, index};
pub use extract::extract;
pub use scrape::{crawl, precios, screenshot, selectors};
