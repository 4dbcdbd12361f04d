//! Leaderboard store: username to points, display-sorted descending.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::errors::CoreError;
use crate::models::LeaderboardEntry;
use crate::persist::JsonStore;

/// Store of leaderboard scores.
pub struct LeaderboardStore {
    store: JsonStore<HashMap<String, u64>>,
}

impl LeaderboardStore {
    /// Create a handle backed by `leaderboard.json` under `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            store: JsonStore::new(data_dir.as_ref().join("leaderboard.json")),
        }
    }

    /// Add one point to `username`, creating the entry at zero first.
    /// Returns the new score.
    pub fn increment(&self, username: &str) -> Result<u64, CoreError> {
        self.store.update(|scores| {
            let score = scores.entry(username.to_string()).or_insert(0);
            *score += 1;
            debug!(username, score = *score, "incremented leaderboard");
            Ok(*score)
        })
    }

    /// Current score for `username`; zero when absent.
    pub fn score(&self, username: &str) -> Result<u64, CoreError> {
        let scores = self.store.read()?;
        Ok(scores.get(username).copied().unwrap_or(0))
    }

    /// All entries ranked by points descending. Ties keep their relative
    /// order from the underlying map iteration (stable sort).
    pub fn rankings(&self) -> Result<Vec<LeaderboardEntry>, CoreError> {
        let scores = self.store.read()?;
        let mut rows: Vec<(String, u64)> = scores.into_iter().collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, (username, points))| LeaderboardEntry {
                rank: i + 1,
                username,
                points,
            })
            .collect())
    }
}
