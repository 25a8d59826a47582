//! Authentication flows: credential verification, identity resolution, and
//! the login / exchange / refresh / logout state machine.
//!
//! The per-provider preambles (password check, ID-token verification at the
//! broker, OAuth code exchange) produce a [`models::VerifiedIdentity`]; from
//! there every flow runs the same tail: resolve the local user, pass the
//! access gate, mint tokens, persist session state.

pub mod models;
pub mod ports;
pub mod services;
