//! REST API endpoint modules.

pub mod auth;
pub mod gamification;
pub mod profile;
pub mod projects;
pub mod rooms;
pub mod snippets;
pub mod status;
