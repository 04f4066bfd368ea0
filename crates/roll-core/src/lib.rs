//! Core types and trait definitions for the Roll attendance register.
//!
//! This crate has no HTTP or database dependencies. The
//! report aggregator lives here as pure functions over in-memory snapshots.

// `RecordStore` impls use `async fn`; the trait declares the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod cache;
pub mod child;
pub mod cohort;
pub mod error;
pub mod label;
pub mod names;
pub mod performance;
pub mod report;
pub mod store;

pub use error::{Error, Result};
