//! Session record persistence for Fourline.
//!
//! This crate is the only place a client talks to the authoritative store:
//!
//! 1. **Storage** ([`SessionStore`] trait, [`MemoryStore`]): `get`, `create`
//!    (rejects duplicate keys) and `update` (whole-record overwrite).
//! 2. **Gateway** ([`Gateway`]): the create / fetch / join / move operations
//!    clients perform, with the conflict checks that keep immutable fields
//!    immutable.
//!
//! # How it fits in the stack
//!
//! ```text
//! Sync Layer (above)      ← turns gateway results into flow events
//!     ↕
//! Gateway Layer (this crate)  ← validates and persists session records
//!     ↕
//! Channel Layer (beside)  ← the store publishes every update to subscribers
//! ```
//!
//! No operation here retries on its own, except that
//! [`Gateway::create_with_fresh_code`] draws a new code after a collision.

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod gateway;
mod memory;
mod store;

pub use config::GatewayConfig;
pub use error::{GatewayError, StoreError};
pub use gateway::Gateway;
pub use memory::MemoryStore;
pub use store::SessionStore;
