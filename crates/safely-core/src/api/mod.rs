//! Authenticated request gateway for the Safely backend.
//!
//! This module provides the `RequestGateway` every screen routes its HTTP
//! traffic through, and the closed `ApiError` taxonomy callers
//! pattern-match on.
//!
//! The backend uses JWT bearer token authentication; the gateway attaches
//! the stored token on each call and invalidates the session when the
//! server rejects it.

pub mod error;
pub mod gateway;

pub use error::ApiError;
pub use gateway::RequestGateway;
