//! Infrastructure implementations.
//!
//! Contains port trait implementations for the storage backends plus the
//! in-process coordination primitives the use cases share.

pub mod clock;
pub mod config;
pub mod keyed_lock;
pub mod memory;
pub mod notifier;
pub mod ports;
pub mod sqlite;
