//! Session lifecycle module.
//!
//! This module provides:
//! - `SessionStore`: durable persistence of the token + user pair
//! - `SessionController`: the state machine driving restore, login,
//!   register and logout
//!
//! Session state is published through a watch channel so the UI layer can
//! react to transitions it did not initiate (e.g. a 401 on a CRUD call).

pub mod controller;
pub mod store;

pub use controller::{OfflinePolicy, SessionController, SessionState};
pub use store::SessionStore;
