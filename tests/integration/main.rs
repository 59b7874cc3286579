//! Integration tests for docsweep
//!
//! These tests drive whole jobs end-to-end against in-process test doubles
//! and wiremock servers, with output directories in temp dirs.

mod common;
mod crawl_tests;
mod enrich_tests;
mod orchestrator_tests;
