//! # Facility Database Crate
//!
//! This crate is the application-specific interface to the PostgreSQL
//! database holding buildings, floors, markers and their management records.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Adapter:** All SQL lives here. Handlers talk to the
//!   `FacilityStore` trait and never see a query string.
//! - **Asynchronous & Pooled:** Every operation is async and runs on a shared
//!   `PgPool`. Multi-statement writes hold one pooled connection for the whole
//!   transaction.
//! - **Bounded:** Each statement (or whole transaction) runs under the
//!   configured query timeout. An expired transaction is dropped, which rolls
//!   it back.
//!
//! ## Public API
//!
//! - `connect`: builds the connection pool from `DatabaseSettings`.
//! - `FacilityStore`: the storage operations the HTTP layer depends on.
//! - `DbRepository`: the PostgreSQL implementation of `FacilityStore`.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, connect_options};
pub use error::DbError;
pub use repository::DbRepository;
pub use store::FacilityStore;
