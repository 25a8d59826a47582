//! SIGNET - Single sign-on authority.
//!
//! This crate implements the session and token plane of the SSO service:
//! asymmetric token issuance, the two-level session model (global SSO session
//! plus per-(user, client, device) application sessions), the login /
//! exchange / refresh / logout flows, and the HTTP + RPC surfaces that expose
//! them to browsers and backend services.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
