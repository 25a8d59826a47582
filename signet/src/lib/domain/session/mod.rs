//! The two-level session model held in the keyed cache.
//!
//! - **Application sessions** ([`store`]): one record per
//!   (user, client, device) triple, keyed by the SHA-256 hash of the live
//!   refresh token, with secondary indexes for enumeration and bulk
//!   invalidation.
//! - **SSO sessions** ([`sso`]): one global record per user plus a reverse
//!   token-hash index; the single source of truth for "this human is still
//!   logged in".
//!
//! Both stores are written against the [`ports::KeyValueStore`] port; the
//! redis adapter lives in `outbound::redis` and tests run on an in-memory
//! implementation. Sessions are intentionally ephemeral: cache loss logs
//! everyone out and nothing else.

pub mod models;
pub mod ports;
pub mod sso;
pub mod store;

#[cfg(test)]
pub mod memory;
