//! Transaction analytics pipeline
//!
//! Reads a large CSV of transactions in parallel chunks, reassembles the rows
//! in source order, aggregates them into four views and serves the result
//! through a memory slot backed by a JSON cache file.

pub mod app;
pub mod config;
pub mod domain;
pub mod engine;
pub mod io;
pub mod prelude;
pub mod service;
pub mod storage;
pub mod streaming;
