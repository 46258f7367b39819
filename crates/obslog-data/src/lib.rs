//! Data layer for apexlog.
//!
//! Responsible for discovering and reading APEX obslog tables, normalising
//! them into typed scan records, merging nights, selecting science scans
//! against the source/line catalogues and summing on-sky time per group.

pub mod aggregator;
pub mod analysis;
pub mod catalogue;
pub mod merger;
pub mod normalizer;
pub mod reader;
pub mod selector;
