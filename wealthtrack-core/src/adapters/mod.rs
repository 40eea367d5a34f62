//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Hosted backend over HTTP for ExpenseBackend and IdentityProvider
//! - In-memory backend for demo mode and tests
//! - Auxiliary REST auth API client (not a port; used directly)

pub mod auth_api;
pub mod hosted;
pub mod memory;

#[cfg(test)]
pub mod mock_server;
