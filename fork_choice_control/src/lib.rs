//! Supporting code for the fork choice store.
//!
//! This crate handles the following concerns:
//! - Serializing mutations of the store.
//! - Publishing consistent snapshots of the store to readers.
//! - Logging rejected objects.
//! - Testing.

pub use crate::controller::Controller;

mod controller;
mod queries;

#[cfg(test)]
mod helpers;
