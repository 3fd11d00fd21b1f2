//! # beaconwatch-server
//!
//! HTTP presentation layer for the beaconwatch iBeacon proximity monitor.
//!
//! This library provides the API handlers, shared state and logging setup
//! used by the `beaconwatch-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod api;
pub mod logging;
pub mod state;
