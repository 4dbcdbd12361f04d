//! Session-completion rewards: badge award plus leaderboard credit.

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::CoreError;
use crate::identity::IdentityStore;
use crate::leaderboard::LeaderboardStore;

/// The one badge handed out for completing a session.
pub const ACTIVE_CODER_BADGE: &str = "Active Coder";

/// What a completed session earned the user.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub awarded: bool,
    pub badge: String,
    pub points: u64,
}

/// Record a completed session for `username`.
///
/// Awards the badge at most once per user; the first award also adds one
/// leaderboard point. The badge and leaderboard writes are independent,
/// with no transaction spanning the two stores.
pub fn complete_session(
    identity: &IdentityStore,
    leaderboard: &LeaderboardStore,
    username: &str,
) -> Result<SessionOutcome, CoreError> {
    let awarded = identity.award_badge(username, ACTIVE_CODER_BADGE)?;
    let points = if awarded {
        let points = leaderboard.increment(username)?;
        info!(username, points, "session completed, badge awarded");
        points
    } else {
        let points = leaderboard.score(username)?;
        debug!(username, "session completed, badge already held");
        points
    };

    Ok(SessionOutcome {
        awarded,
        badge: ACTIVE_CODER_BADGE.to_string(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::models::Registration;

    fn stores() -> (tempfile::TempDir, IdentityStore, LeaderboardStore) {
        let dir = tempfile::tempdir().unwrap();
        let identity = IdentityStore::new(dir.path());
        let leaderboard = LeaderboardStore::new(dir.path());
        identity
            .register(Registration {
                username: "alice".into(),
                college_id: "ABCD123456".into(),
                email: "alice@example.com".into(),
                date_of_birth: "2001-04-12".into(),
                password: "pw1".into(),
                confirm_password: "pw1".into(),
            })
            .unwrap();
        (dir, identity, leaderboard)
    }

    #[test]
    fn test_first_session_awards_badge_and_point() {
        let (_dir, identity, leaderboard) = stores();

        let outcome = complete_session(&identity, &leaderboard, "alice").unwrap();
        assert!(outcome.awarded);
        assert_eq!(outcome.badge, ACTIVE_CODER_BADGE);
        assert_eq!(outcome.points, 1);

        let user = identity.get("alice").unwrap();
        assert_eq!(user.badges, vec![ACTIVE_CODER_BADGE.to_string()]);
    }

    #[test]
    fn test_badge_is_never_duplicated() {
        let (_dir, identity, leaderboard) = stores();

        complete_session(&identity, &leaderboard, "alice").unwrap();
        for _ in 0..3 {
            let outcome = complete_session(&identity, &leaderboard, "alice").unwrap();
            assert!(!outcome.awarded);
            assert_eq!(outcome.points, 1);
        }

        assert_eq!(identity.get("alice").unwrap().badges.len(), 1);
        assert_eq!(leaderboard.score("alice").unwrap(), 1);
    }

    #[test]
    fn test_unknown_user_touches_nothing() {
        let (_dir, identity, leaderboard) = stores();

        let result = complete_session(&identity, &leaderboard, "ghost");
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
        assert_eq!(leaderboard.score("ghost").unwrap(), 0);
    }
}
