//! Shared data types for the session core.

use serde::{Deserialize, Serialize};

/// The authenticated user as returned by the backend.
/// The backend serves Mongo documents, so `_id` is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
}

/// A persisted session: the bearer token paired with the user it
/// authenticates. The two are always stored and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub user: User,
}

/// Body of a successful `/auth/login` or `/auth/register` response.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Body of a successful `/api/profile` response.
#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
}
