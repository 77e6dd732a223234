// Swarm - social network backend
//
// The interesting part lives in domains/randomizing_jobs: a persistent,
// resumable background engine that materialises batches of synthetic users.
// Everything else (HTTP surface, repositories, config) is conventional.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
