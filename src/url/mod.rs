//! URL handling module for docsweep
//!
//! This module provides URL normalization, crawl scope matching, and the
//! derivation of local output paths from page URLs.

mod normalize;
mod path;
mod scope;

pub use normalize::normalize_url;
pub use path::output_path_for;
pub use scope::ScopePrefixes;
