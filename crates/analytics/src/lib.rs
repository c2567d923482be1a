//! # Facility Analytics
//!
//! Turns sparse per-day shake counts into the dense, normalized series the
//! movement chart draws.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** A pure logic crate. It depends only on `core-types`
//!   and never touches the database.
//! - **Stateless Calculation:** `bucket` is a deterministic function of its
//!   inputs, which makes it trivial to test.
//!
//! ## Public API
//!
//! - `bucket`: builds a `DailyHistogram` from a window and sparse rows.
//! - `observation_window`: the one-month window anchored at a shake date.
//! - `AnalyticsError`: the specific error types returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod histogram;

// Re-export the key components to create a clean, public-facing API.
pub use error::AnalyticsError;
pub use histogram::{DailyHistogram, bucket, observation_window};
