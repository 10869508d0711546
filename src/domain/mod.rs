//! Domain layer containing round state and its vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `round` - Round snapshot, outcome, and the client-side projection

pub mod foundation;
pub mod round;
