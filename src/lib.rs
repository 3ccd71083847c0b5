// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod aggregator;
pub mod alias;
pub mod cache;
pub mod config;
pub mod export;
pub mod matcher;
pub mod models;
pub mod normalizer;
pub mod projections;
pub mod sources;
pub mod vbd;
