//! Domain model types used throughout codesync.
//!
//! These types bridge the JSON stores and the web API.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A registered user account.
///
/// Persisted in `users.json` keyed by username. Badges are stored inline and
/// mutated when one is earned; accounts are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub college_id: String,
    pub email: String,
    pub date_of_birth: String,
    pub password: String,
    #[serde(default)]
    pub badges: Vec<String>,
}

/// Signup form payload, validated before any account is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub college_id: String,
    pub email: String,
    pub date_of_birth: String,
    pub password: String,
    pub confirm_password: String,
}

/// Public view of a user, stripped of credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub college_id: String,
    pub email: String,
    pub date_of_birth: String,
    pub badges: Vec<String>,
    pub points: u64,
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// A shared classroom room: one code buffer plus a chat log.
///
/// Persisted in `rooms.json` keyed by room id. The code buffer is replaced
/// wholesale on save; participants grow monotonically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// A single chat entry within a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub user: String,
    pub message: String,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Snippets
// ---------------------------------------------------------------------------

/// A reusable code snippet shared across the classroom.
///
/// Persisted in `snippets.json` as a flat list; append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snippet {
    pub title: String,
    pub code: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Projects & forks
// ---------------------------------------------------------------------------

/// A project with one canonical code branch and any number of forks.
///
/// Persisted in `projects.json` keyed by project id. Only the owner may
/// merge a fork into `main_branch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub main_branch: String,
    pub owner: String,
    #[serde(default)]
    pub forks: HashMap<String, Fork>,
}

/// A working copy of a project's main branch, owned by its creator.
///
/// `changes` always reflects the most recent edit only: each save replaces
/// it with a fresh diff against the previously stored fork code. Merging
/// destroys the fork entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fork {
    pub user: String,
    pub code: String,
    #[serde(default)]
    pub pull_request: bool,
    #[serde(default)]
    pub changes: Vec<String>,
}

/// A fork with its surrounding project context, as listed to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkOverview {
    pub project_id: String,
    pub project_name: String,
    pub fork_id: String,
    pub fork: Fork,
}

// ---------------------------------------------------------------------------
// Leaderboard & execution
// ---------------------------------------------------------------------------

/// One row of the leaderboard, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub points: u64,
}

/// Outcome of running a piece of submitted code.
///
/// A non-zero exit code is a normal outcome, not an error: the author sees
/// their interpreter traceback in `stderr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// An authenticated session, carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionContext {
    /// Whether this session is past its expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_room_defaults_for_missing_fields() {
        // Store documents written before the chat log existed still load.
        let json = r#"{"id":"rust101","description":"intro session"}"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert!(room.code.is_empty());
        assert!(room.chat.is_empty());
        assert!(room.participants.is_empty());
    }

    #[test]
    fn test_fork_defaults() {
        let json = r#"{"user":"alice","code":"print(1)"}"#;
        let fork: Fork = serde_json::from_str(json).unwrap();
        assert!(!fork.pull_request);
        assert!(fork.changes.is_empty());
    }

    #[test]
    fn test_project_round_trip() {
        let mut forks = HashMap::new();
        forks.insert(
            "f1".to_string(),
            Fork {
                user: "alice".into(),
                code: "print(2)".into(),
                pull_request: true,
                changes: vec!["- print(1)".into(), "+ print(2)".into()],
            },
        );
        let project = Project {
            id: "p1".into(),
            name: "Demo".into(),
            main_branch: "print(1)".into(),
            owner: "bob".into(),
            forks,
        };

        let json = serde_json::to_string(&project).unwrap();
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let live = SessionContext {
            token: "t1".into(),
            username: "alice".into(),
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        assert!(!live.is_expired());

        let dead = SessionContext {
            token: "t2".into(),
            username: "alice".into(),
            created_at: now - Duration::hours(2),
            expires_at: now - Duration::hours(1),
        };
        assert!(dead.is_expired());
    }
}
