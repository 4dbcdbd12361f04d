//! codesync core library.
//!
//! This crate provides the foundational components for the collaborative
//! coding classroom: configuration, flat-file JSON persistence, user
//! identity and sessions, shared rooms, the snippet library, gamification,
//! code execution, and the project fork/pull-request workflow.

pub mod changes;
pub mod config;
pub mod errors;
pub mod exec;
pub mod gamification;
pub mod identity;
pub mod leaderboard;
pub mod mailer;
pub mod models;
pub mod otp;
pub mod persist;
pub mod projects;
pub mod rooms;
pub mod session;
pub mod snippets;

// Re-exports for convenience.
pub use changes::ChangeTracker;
pub use config::AppConfig;
pub use errors::CoreError;
pub use exec::CodeRunner;
pub use identity::IdentityStore;
pub use leaderboard::LeaderboardStore;
pub use mailer::OtpMailer;
pub use otp::OtpFlows;
pub use projects::ProjectStore;
pub use rooms::RoomStore;
pub use session::SessionRegistry;
pub use snippets::SnippetStore;
