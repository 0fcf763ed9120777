/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Login, auth callback (profile provisioning) and logout
/// - `search`: Project and task search

pub mod auth;
pub mod health;
pub mod search;
