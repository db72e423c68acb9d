//! Utility functions and helpers.
//!
//! - [`hash`]: digest algorithms and the file/symlink [`hash::Hasher`]
//! - [`paths`]: normalization, relative paths and the JSON path encoding
//! - [`serialization`]: JSON encoding and atomic file replacement
//! - [`thread_pool`]: the rayon pool hashing runs on

/// Content hashing
pub mod hash;
/// Path manipulation and resolution utilities
pub mod paths;
/// JSON serialization and atomic writes
pub mod serialization;
/// Thread pool configuration for parallel hashing
pub mod thread_pool;
