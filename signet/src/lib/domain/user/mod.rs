//! User identity read model.
//!
//! Users are created and mutated by the out-of-scope admin plane; the auth
//! flows only ever read them. Deleted and soft-deleted users are never
//! returned by any port in this module.

pub mod models;
pub mod ports;
