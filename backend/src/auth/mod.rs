//! Authentication module for credential issuance, rotation and revocation.
//!
//! This module provides the public interface for login, refresh and logout,
//! the bearer middleware guarding the other routes, the storage traits the
//! flows depend on and the background reaper for expired records.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod reaper;
pub mod routes;
pub mod service;
pub mod store;
