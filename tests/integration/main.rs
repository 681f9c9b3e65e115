//! Integration tests for Site-Sync
//!
//! These tests run discovery, crawls and reconciliation against wiremock
//! servers. The headless tier is replaced by an in-process renderer.

mod common;
mod crawl_tests;
mod discovery_tests;
mod job_tests;
mod sync_tests;
