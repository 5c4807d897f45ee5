//! Canopy Core Content Engine
//!
//! This crate provides the tree mutation and publication engine for the
//! Canopy content management system: a hierarchically organized collection of
//! versioned content nodes with structural mutation (move, copy, delete) and
//! a publish/unpublish workflow kept consistent across whole subtrees.
//!
//! # Architecture
//!
//! - **Materialized paths**: every node stores its full ancestor chain, so
//!   subtree queries are prefix scans and cascades recompute paths in one
//!   ordered walk
//! - **Tree-wide locking**: a single named write lock serializes all
//!   structural mutations; readers run concurrently
//! - **Scoped transactions**: every operation runs inside a scope whose
//!   staged writes commit atomically or roll back on early return and
//!   observer cancellation
//! - **Injected collaborators**: notification bus, audit writer and file
//!   cleanup are explicit objects, never global registrations
//!
//! # Modules
//!
//! - [`models`] - data structures (`ContentNode`, materialized paths)
//! - [`db`] - repository contracts, transaction scopes, locking, and the
//!   in-memory reference store
//! - [`events`] - cancellable/non-cancellable notification surface
//! - [`services`] - `ContentService` (tree mutator + publication engine)

pub mod db;
pub mod events;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::*;
pub use events::*;
pub use models::*;
pub use services::*;
