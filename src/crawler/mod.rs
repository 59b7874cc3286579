//! Crawler module for documentation sites
//!
//! This module contains the crawl side of the engine:
//! - The frontier over a persisted crawl session
//! - The per-page driver loop with content change detection
//! - The render capability and its HTTP implementation
//! - Link extraction and the HTML to text transform

mod driver;
mod frontier;
mod parser;
mod render;
mod transform;

pub use driver::{CrawlDriver, CrawlOutcome, CrawlReport};
pub use frontier::{Enqueue, Frontier, SessionOrigin};
pub use parser::{extract_links, PageLinks};
pub use render::{build_http_client, HttpRenderer, RenderError, RenderedPage, Renderer};
pub use transform::{content_hash, TextTransform, Transform};
