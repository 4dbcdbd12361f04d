//! Shared snippet library.
//!
//! Snippets live in `snippets.json` as a flat append-only list. Search is a
//! case-insensitive substring match over titles and tags; there is no
//! update or delete path.

use std::path::Path;

use tracing::{debug, info};

use crate::errors::{CoreError, ValidationError};
use crate::models::Snippet;
use crate::persist::JsonStore;

/// Store of shared code snippets.
pub struct SnippetStore {
    store: JsonStore<Vec<Snippet>>,
}

impl SnippetStore {
    /// Create a handle backed by `snippets.json` under `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            store: JsonStore::new(data_dir.as_ref().join("snippets.json")),
        }
    }

    /// Append a snippet. Title and code are both required.
    pub fn add(&self, title: &str, code: &str, tags: Vec<String>) -> Result<Snippet, CoreError> {
        self.store.update(|snippets| {
            if title.is_empty() {
                return Err(ValidationError::MissingField("title").into());
            }
            if code.is_empty() {
                return Err(ValidationError::MissingField("code").into());
            }
            let snippet = Snippet {
                title: title.to_string(),
                code: code.to_string(),
                tags,
            };
            snippets.push(snippet.clone());
            info!(title, "saved snippet");
            Ok(snippet)
        })
    }

    /// Return every snippet whose title or any tag contains `query`,
    /// case-insensitively. An empty query matches everything.
    pub fn search(&self, query: &str) -> Result<Vec<Snippet>, CoreError> {
        let snippets = self.store.read()?;
        let q = query.to_lowercase();
        let hits: Vec<Snippet> = snippets
            .into_iter()
            .filter(|s| {
                s.title.to_lowercase().contains(&q)
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&q))
            })
            .collect();
        debug!(query, hits = hits.len(), "searched snippets");
        Ok(hits)
    }
}
