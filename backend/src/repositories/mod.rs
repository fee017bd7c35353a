//! Storage backends for the account directory and the credential store.

pub mod account_repository;
pub mod memory_store;
pub mod token_repository;
