//! Core types and trait definitions for the PSUR schedule store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! The query engine, statistics aggregator and cycle rules are pure functions
//! over record snapshots; the rollover engine talks to storage only through
//! the [`store::ScheduleStore`] trait.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod cycle;
pub mod error;
pub mod identifier;
pub mod patch;
pub mod query;
pub mod record;
pub mod rollover;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
