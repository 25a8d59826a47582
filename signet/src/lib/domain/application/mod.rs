//! Downstream applications and the access gate.
//!
//! An application is a downstream system permitted to receive tokens. Its
//! short code is the `client_id` used in token claims and session keys. The
//! access gate decides whether a resolved user may obtain tokens for a given
//! code and surfaces the application's per-app session policy.

pub mod gate;
pub mod models;
pub mod ports;
