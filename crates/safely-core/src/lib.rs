//! Core library for the Safely workplace-safety client.
//!
//! This crate owns the client-side session lifecycle: durable credential
//! storage, discovery of a reachable backend among several candidate base
//! URLs, and an authenticated request gateway with a closed error taxonomy.
//!
//! Screens and domain resources (accidents, PPE, chemicals, ...) live in the
//! UI layer and consume this crate only through
//! [`RequestGateway::request`] and the session state watch channel exposed by
//! [`SessionController::subscribe`].

pub mod api;
pub mod auth;
pub mod config;
pub mod endpoint;
pub mod models;

pub use api::{ApiError, RequestGateway};
pub use auth::{OfflinePolicy, SessionController, SessionState, SessionStore};
pub use config::Config;
pub use endpoint::{BackoffPolicy, EndpointResolver, ResolvedEndpoint};
pub use models::{Credential, User};
