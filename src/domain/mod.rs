//! Domain layer containing presence and breakout types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, scopes, events, errors)
//! - `presence` - Live connections and the identities they belong to
//! - `breakout` - Rooms, partitioning, and breakout errors

pub mod breakout;
pub mod foundation;
pub mod presence;
