//! # Facility Core Types
//!
//! The shared vocabulary of the facility backend: the rows read from the
//! database, the shapes returned over HTTP, and the small parsing helpers that
//! turn client input into strongly typed values.
//!
//! As a Layer 0 crate it has no knowledge of HTTP or connection pools.

// Declare the modules that make up this crate.
pub mod error;
pub mod location;
pub mod structs;
pub mod timestamp;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use location::Location;
pub use structs::{
    CategoryPlace, DailyCount, ManagementEntry, ManagementUpdate, MarkerPoint, Place, ShakeAnchor,
};
pub use timestamp::{from_epoch, parse_timestamp};
