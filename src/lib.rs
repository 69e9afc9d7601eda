//! Town Hall Presence - live connection tracking and breakout rooms
//!
//! Tracks which connections are in which town-hall event, splits an
//! event's audience into randomized breakout rooms, restores room
//! membership across reconnects, and fans domain events out to exactly
//! the connections in the affected scope.

pub mod adapters;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
