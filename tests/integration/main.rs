//! Integration tests for Flocrawl
//!
//! These tests drive the coordinator and the tool layer end to end, against
//! wiremock servers or instrumented in-memory fetchers.

mod common;
mod crawl_tests;
mod tools_tests;
