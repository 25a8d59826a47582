//! Health check operations for service monitoring.
//!
//! Verifies the service can reach its two stateful dependencies: the
//! relational store and the session cache. Exposed as the `/health/*`
//! routes for load balancers and probes.

/// Health check models and error types.
pub mod models;

/// Port traits (interfaces) for health check operations.
pub mod ports;

/// Service implementations for health check logic.
pub mod services;
