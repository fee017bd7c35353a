//! Collection of general utility functions.
//!
//! Token signing and verification, and device classification of the
//! clients that log in.

pub mod device;
pub mod jwt;
